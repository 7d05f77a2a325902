use crate::interface::{CreatableResource, ResourceKind};
use sprintdesk_domain::{
    NewProject, NewSprint, NewTask, Project, ProjectId, Sprint, SprintId, Task, TaskId,
    Team, TeamId, UserId,
};

/// Teams are scoped by the member user. Not a `CreatableResource`: a team is
/// only created together with its creator membership, through
/// `ResourceClient::create_team_with_membership`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamKind;

impl ResourceKind for TeamKind {
    type Id = TeamId;
    type Parent = UserId;
    type Item = Team;

    const NAME: &'static str = "team";
    const LIST_PATH: &'static str = "usuariosEquipo/getEquipoTrabajoPerUser/";
    const PARENT_KEY: &'static str = "usuario_id";
    const COLLECTION_PATH: &'static str = "equipos";

    fn item_id(item: &Team) -> TeamId {
        item.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectKind;

impl ResourceKind for ProjectKind {
    type Id = ProjectId;
    type Parent = TeamId;
    type Item = Project;

    const NAME: &'static str = "project";
    const LIST_PATH: &'static str = "proyectos/getProyectosPerEquipo/";
    const PARENT_KEY: &'static str = "equipo_id";
    const COLLECTION_PATH: &'static str = "proyectos";

    fn item_id(item: &Project) -> ProjectId {
        item.id
    }
}

impl CreatableResource for ProjectKind {
    type Draft = NewProject;

    fn draft_parent(draft: &NewProject) -> TeamId {
        draft.team
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintKind;

impl ResourceKind for SprintKind {
    type Id = SprintId;
    type Parent = ProjectId;
    type Item = Sprint;

    const NAME: &'static str = "sprint";
    const LIST_PATH: &'static str = "sprints/getSprintsPerProyecto/";
    const PARENT_KEY: &'static str = "proyecto_id";
    const COLLECTION_PATH: &'static str = "sprints";

    fn item_id(item: &Sprint) -> SprintId {
        item.id
    }
}

impl CreatableResource for SprintKind {
    type Draft = NewSprint;

    fn draft_parent(draft: &NewSprint) -> ProjectId {
        draft.project
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskKind;

impl ResourceKind for TaskKind {
    type Id = TaskId;
    type Parent = SprintId;
    type Item = Task;

    const NAME: &'static str = "task";
    const LIST_PATH: &'static str = "tareas/getTareaPerSprint/";
    const PARENT_KEY: &'static str = "sprint_id";
    const COLLECTION_PATH: &'static str = "tareas";

    fn item_id(item: &Task) -> TaskId {
        item.id
    }
}

impl CreatableResource for TaskKind {
    type Draft = NewTask;

    fn draft_parent(draft: &NewTask) -> SprintId {
        draft.sprint
    }
}
