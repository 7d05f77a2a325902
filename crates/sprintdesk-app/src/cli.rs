use chrono::NaiveDate;
use sprintdesk_controller::Route;
use sprintdesk_domain::{
    ClientError, ClientResult, IdParseError, MembershipId, ProjectId, SprintId, TaskId, TeamId,
    UserId,
};
use std::collections::HashMap;
use std::str::FromStr;

const VALUE_FLAGS: &[&str] = &[
    "--team",
    "--project",
    "--sprint",
    "--user",
    "--assignee",
    "--status",
    "--start",
    "--email",
    "--filter",
];
const DEFAULT_TASK_STATUS: &str = "pendiente";

/// Ids supplied on the command line; anything missing falls back to the session context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeArgs {
    pub team: Option<TeamId>,
    pub project: Option<ProjectId>,
    pub sprint: Option<SprintId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Login {
        email: String,
        password: String,
        user: Option<UserId>,
    },
    Logout,
    Register {
        name: String,
        email: String,
        password: String,
    },
    Context,
    Open {
        route: Route,
    },
    Teams,
    CreateTeam {
        name: String,
        description: String,
    },
    DeleteTeam {
        team: TeamId,
    },
    Members {
        scope: ScopeArgs,
        filter: Option<String>,
    },
    AddMember {
        scope: ScopeArgs,
        user: UserId,
    },
    RemoveMember {
        scope: ScopeArgs,
        membership: MembershipId,
    },
    Users {
        email: Option<String>,
    },
    Projects {
        scope: ScopeArgs,
    },
    Sprints {
        scope: ScopeArgs,
    },
    CreateSprint {
        scope: ScopeArgs,
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    DeleteSprint {
        scope: ScopeArgs,
        sprint: SprintId,
    },
    Tasks {
        scope: ScopeArgs,
    },
    CreateTask {
        scope: ScopeArgs,
        assignee: Option<UserId>,
        name: String,
        description: String,
        status: String,
        start: Option<NaiveDate>,
        end: NaiveDate,
    },
    DeleteTask {
        scope: ScopeArgs,
        task: TaskId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliInvocation {
    pub assume_yes: bool,
    pub command: Command,
}

#[derive(Debug, Default)]
struct ParsedArgs {
    flags: HashMap<String, String>,
    positionals: Vec<String>,
}

impl ParsedArgs {
    fn text(&self, flag: &str) -> Option<String> {
        self.flags.get(flag).cloned()
    }

    fn id<T>(&self, flag: &str) -> ClientResult<Option<T>>
    where
        T: FromStr<Err = IdParseError>,
    {
        self.flags
            .get(flag)
            .map(|raw| parse_id(flag, raw))
            .transpose()
    }

    fn date(&self, flag: &str) -> ClientResult<Option<NaiveDate>> {
        self.flags
            .get(flag)
            .map(|raw| parse_date(flag, raw))
            .transpose()
    }

    fn scope(&self) -> ClientResult<ScopeArgs> {
        Ok(ScopeArgs {
            team: self.id("--team")?,
            project: self.id("--project")?,
            sprint: self.id("--sprint")?,
        })
    }

    fn expect_positionals(&self, command: &str, names: &[&str]) -> ClientResult<()> {
        if self.positionals.len() == names.len() {
            return Ok(());
        }
        let usage = names
            .iter()
            .map(|name| format!("<{name}>"))
            .collect::<Vec<_>>()
            .join(" ");
        Err(ClientError::Configuration(format!(
            "'{command}' expects {} argument(s): {command} {usage}",
            names.len()
        )))
    }
}

pub fn parse_args<I>(args: I) -> ClientResult<CliInvocation>
where
    I: IntoIterator<Item = String>,
{
    let mut assume_yes = false;
    let mut command_name: Option<String> = None;
    let mut parsed = ParsedArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--yes" | "-y" => assume_yes = true,
            "--help" | "-h" => {
                return Ok(CliInvocation {
                    assume_yes,
                    command: Command::Help,
                })
            }
            flag if VALUE_FLAGS.contains(&flag) => {
                let value = args.next().ok_or_else(|| {
                    ClientError::Configuration(format!("Missing value after {flag}."))
                })?;
                let value = value.trim().to_owned();
                if value.is_empty() {
                    return Err(ClientError::Configuration(format!(
                        "Flag '{flag}' requires a non-empty value."
                    )));
                }
                parsed.flags.insert(flag.to_owned(), value);
            }
            value if value.starts_with("--") => {
                return Err(ClientError::Configuration(format!(
                    "Unknown flag '{value}'. Run with --help for valid flags."
                )));
            }
            _ if command_name.is_none() => command_name = Some(arg),
            _ => parsed.positionals.push(arg),
        }
    }

    let Some(command_name) = command_name else {
        return Ok(CliInvocation {
            assume_yes,
            command: Command::Help,
        });
    };

    let command = build_command(&command_name, &parsed)?;
    Ok(CliInvocation {
        assume_yes,
        command,
    })
}

fn build_command(name: &str, parsed: &ParsedArgs) -> ClientResult<Command> {
    let positional = |index: usize| parsed.positionals[index].clone();
    let command = match name {
        "help" => Command::Help,
        "login" => {
            parsed.expect_positionals(name, &["email", "password"])?;
            Command::Login {
                email: positional(0),
                password: positional(1),
                user: parsed.id("--user")?,
            }
        }
        "logout" => {
            parsed.expect_positionals(name, &[])?;
            Command::Logout
        }
        "register" => {
            parsed.expect_positionals(name, &["name", "email", "password"])?;
            Command::Register {
                name: positional(0),
                email: positional(1),
                password: positional(2),
            }
        }
        "context" => {
            parsed.expect_positionals(name, &[])?;
            Command::Context
        }
        "open" => {
            parsed.expect_positionals(name, &["route"])?;
            Command::Open {
                route: Route::parse(&positional(0))
                    .map_err(|error| ClientError::Configuration(error.to_string()))?,
            }
        }
        "teams" => {
            parsed.expect_positionals(name, &[])?;
            Command::Teams
        }
        "create-team" => {
            parsed.expect_positionals(name, &["name", "description"])?;
            Command::CreateTeam {
                name: positional(0),
                description: positional(1),
            }
        }
        "delete-team" => {
            parsed.expect_positionals(name, &["team-id"])?;
            Command::DeleteTeam {
                team: parse_id("team-id", &positional(0))?,
            }
        }
        "members" => {
            parsed.expect_positionals(name, &[])?;
            Command::Members {
                scope: parsed.scope()?,
                filter: parsed.text("--filter"),
            }
        }
        "add-member" => {
            parsed.expect_positionals(name, &["user-id"])?;
            Command::AddMember {
                scope: parsed.scope()?,
                user: parse_id("user-id", &positional(0))?,
            }
        }
        "remove-member" => {
            parsed.expect_positionals(name, &["membership-id"])?;
            Command::RemoveMember {
                scope: parsed.scope()?,
                membership: parse_id("membership-id", &positional(0))?,
            }
        }
        "users" => {
            parsed.expect_positionals(name, &[])?;
            Command::Users {
                email: parsed.text("--email"),
            }
        }
        "projects" => {
            parsed.expect_positionals(name, &[])?;
            Command::Projects {
                scope: parsed.scope()?,
            }
        }
        "sprints" => {
            parsed.expect_positionals(name, &[])?;
            Command::Sprints {
                scope: parsed.scope()?,
            }
        }
        "create-sprint" => {
            parsed.expect_positionals(name, &["name", "start", "end"])?;
            Command::CreateSprint {
                scope: parsed.scope()?,
                name: positional(0),
                start: parse_date("start", &positional(1))?,
                end: parse_date("end", &positional(2))?,
            }
        }
        "delete-sprint" => {
            parsed.expect_positionals(name, &["sprint-id"])?;
            Command::DeleteSprint {
                scope: parsed.scope()?,
                sprint: parse_id("sprint-id", &positional(0))?,
            }
        }
        "tasks" => {
            parsed.expect_positionals(name, &[])?;
            Command::Tasks {
                scope: parsed.scope()?,
            }
        }
        "create-task" => {
            parsed.expect_positionals(name, &["name", "description", "end"])?;
            Command::CreateTask {
                scope: parsed.scope()?,
                assignee: parsed.id("--assignee")?,
                name: positional(0),
                description: positional(1),
                status: parsed
                    .text("--status")
                    .unwrap_or_else(|| DEFAULT_TASK_STATUS.to_owned()),
                start: parsed.date("--start")?,
                end: parse_date("end", &positional(2))?,
            }
        }
        "delete-task" => {
            parsed.expect_positionals(name, &["task-id"])?;
            Command::DeleteTask {
                scope: parsed.scope()?,
                task: parse_id("task-id", &positional(0))?,
            }
        }
        unknown => {
            return Err(ClientError::Configuration(format!(
                "Unknown command '{unknown}'. Run with --help for valid commands."
            )))
        }
    };
    Ok(command)
}

fn parse_id<T>(name: &str, raw: &str) -> ClientResult<T>
where
    T: FromStr<Err = IdParseError>,
{
    raw.parse::<T>()
        .map_err(|error| ClientError::Configuration(format!("{name}: {error}")))
}

fn parse_date(name: &str, raw: &str) -> ClientResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ClientError::Configuration(format!("{name} must be a YYYY-MM-DD date, got '{raw}'"))
    })
}

pub fn print_help() {
    println!("Usage: sprintdesk [--yes] <command> [flags] [args]");
    println!();
    println!("  login <email> <password> [--user N]      Sign in and remember the session");
    println!("  logout                                   Forget tokens and scope context");
    println!("  register <name> <email> <password>       Create an account");
    println!("  context                                  Show the remembered scope ids");
    println!("  open <route>                             Resolve a route such as /teams/1/projects");
    println!("  teams | create-team <name> <desc> | delete-team <id>");
    println!("  members [--team N] [--filter Q] | add-member <user> | remove-member <membership>");
    println!("  users [--email Q]");
    println!("  projects [--team N]");
    println!("  sprints --project N | create-sprint <name> <start> <end> | delete-sprint <id>");
    println!("  tasks --project N --sprint N | create-task <name> <desc> <end> | delete-task <id>");
    println!("      create-task flags: [--assignee N] [--status S] [--start YYYY-MM-DD]");
    println!();
    println!("  --team/--project/--sprint default to the session context where possible.");
    println!("  --yes                                    Skip delete confirmations");
    println!("  --help                                   Show this help message");
}
