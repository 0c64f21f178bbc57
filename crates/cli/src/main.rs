use anyhow::{bail, Context};
use api_shared::TokenVerifier;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use mindcare_core::config::{CoreConfig, StorageKind};
use mindcare_core::constants::DEFAULT_DATA_DIR;
use mindcare_core::models::{NewUser, User};
use mindcare_core::{CoreServices, EmailAddress, Identity, NonEmptyText, Role};
use rand::RngCore;
use std::io::Write;
use std::path::PathBuf;

const MAX_TOKEN_HOURS: i64 = 24 * 366;

#[derive(Parser)]
#[command(name = "mindcare")]
#[command(about = "MindCare operator CLI")]
struct Cli {
    /// Root of the file store
    #[arg(long, env = "MINDCARE_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user records
    #[command(subcommand)]
    Users(UserCommands),
    /// Replace a therapist's patients
    Assign {
        /// Email of the acting admin
        #[arg(long)]
        admin: String,
        /// Therapist email
        therapist: String,
        /// Patient emails; none clears the roster
        patients: Vec<String>,
    },
    /// Remove one patient from a therapist
    Unassign {
        /// Email of the acting admin
        #[arg(long)]
        admin: String,
        /// Therapist email
        therapist: String,
        /// Patient email
        patient: String,
    },
    /// Show a therapist's patients
    Roster {
        /// Email of the acting admin
        #[arg(long)]
        admin: String,
        /// Therapist email
        therapist: String,
    },
    /// Issue a bearer token for a user
    Token {
        /// User email
        email: String,
        /// Token lifetime in hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
        /// Signing secret
        #[arg(long, env = "MINDCARE_TOKEN_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Print a random token secret
    GenSecret,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user of any role, including admin
    Add {
        /// patient, therapist or admin
        #[arg(long)]
        role: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Email address
        #[arg(long)]
        email: String,
    },
    /// List every user
    List {
        /// Email of the acting admin
        #[arg(long)]
        admin: String,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = run(cli, &mut stdout) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open(data_dir: PathBuf) -> anyhow::Result<CoreServices> {
    let cfg = CoreConfig::new(StorageKind::File, data_dir, None)?;
    Ok(CoreServices::from_config(&cfg)?)
}

fn user_by_email(core: &CoreServices, email: &str) -> anyhow::Result<User> {
    let email = EmailAddress::parse(email)?;
    core.users
        .find_by_email(&email)?
        .with_context(|| format!("no user with email {}", email))
}

fn admin_identity(core: &CoreServices, email: &str) -> anyhow::Result<Identity> {
    let user = user_by_email(core, email)?;
    if user.role != Role::Admin {
        bail!("{} is not an admin", user.email);
    }
    Ok(user.identity())
}

fn print_roster(
    core: &CoreServices,
    out: &mut impl Write,
    patients: impl IntoIterator<Item = mindcare_core::RecordId>,
) -> anyhow::Result<()> {
    let mut any = false;
    for patient_id in patients {
        any = true;
        match core.users.identity_of(patient_id)? {
            Some(_) => writeln!(out, "  {}", patient_id)?,
            None => writeln!(out, "  {} (missing user)", patient_id)?,
        }
    }
    if !any {
        writeln!(out, "  (no patients)")?;
    }
    Ok(())
}

fn gen_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        writeln!(out, "Use 'mindcare --help' for commands")?;
        return Ok(());
    };

    match command {
        Commands::GenSecret => {
            writeln!(out, "{}", gen_secret())?;
        }
        Commands::Users(UserCommands::Add { role, name, email }) => {
            let core = open(cli.data_dir)?;
            let user = core.users.create_user(NewUser {
                role: Role::parse(&role)?,
                display_name: NonEmptyText::new(&name)?,
                email: EmailAddress::parse(&email)?,
            })?;
            writeln!(out, "Created {} {} ({})", user.role, user.id, user.email)?;
        }
        Commands::Users(UserCommands::List { admin }) => {
            let core = open(cli.data_dir)?;
            let admin = admin_identity(&core, &admin)?;
            let users = core.users.list(&admin)?;
            if users.is_empty() {
                writeln!(out, "No users found.")?;
            }
            for user in users {
                writeln!(
                    out,
                    "ID: {}, Role: {}, Name: {}, Email: {}, Created: {}",
                    user.id, user.role, user.display_name, user.email, user.created_at
                )?;
            }
        }
        Commands::Assign {
            admin,
            therapist,
            patients,
        } => {
            let core = open(cli.data_dir)?;
            let admin = admin_identity(&core, &admin)?;
            let therapist = user_by_email(&core, &therapist)?;
            let patient_ids = patients
                .iter()
                .map(|email| user_by_email(&core, email).map(|u| u.id))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let roster = core.assignments.assign(&admin, therapist.id, patient_ids)?;
            writeln!(out, "Patients of {}:", therapist.email)?;
            print_roster(&core, out, roster.patient_ids)?;
        }
        Commands::Unassign {
            admin,
            therapist,
            patient,
        } => {
            let core = open(cli.data_dir)?;
            let admin = admin_identity(&core, &admin)?;
            let therapist = user_by_email(&core, &therapist)?;
            let patient = user_by_email(&core, &patient)?;

            let roster = core.assignments.unassign(&admin, therapist.id, patient.id)?;
            writeln!(out, "Removed {} from {}", patient.email, therapist.email)?;
            print_roster(&core, out, roster.patient_ids)?;
        }
        Commands::Roster { admin, therapist } => {
            let core = open(cli.data_dir)?;
            let admin = admin_identity(&core, &admin)?;
            let therapist = user_by_email(&core, &therapist)?;

            let roster = core.assignments.roster(&admin, therapist.id)?;
            writeln!(out, "Patients of {}:", therapist.email)?;
            print_roster(&core, out, roster.patient_ids)?;
        }
        Commands::Token {
            email,
            hours,
            secret,
        } => {
            if !(1..=MAX_TOKEN_HOURS).contains(&hours) {
                bail!("token lifetime must be between 1 and {MAX_TOKEN_HOURS} hours");
            }
            let ttl = chrono::Duration::try_hours(hours).context("token lifetime out of range")?;
            let verifier = TokenVerifier::new(secret.into_bytes())?;
            let core = open(cli.data_dir)?;
            let user = user_by_email(&core, &email)?;
            let token = verifier.issue(&user.identity(), ttl)?;
            writeln!(out, "{}", token)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn exec(dir: &std::path::Path, args: &[&str]) -> anyhow::Result<String> {
        let mut argv = vec!["mindcare", "--data-dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn seed(dir: &std::path::Path) {
        for (role, name, email) in [
            ("admin", "Ada", "ada@example.com"),
            ("therapist", "Tom", "tom@example.com"),
            ("patient", "Pat", "pat@example.com"),
        ] {
            exec(
                dir,
                &["users", "add", "--role", role, "--name", name, "--email", email],
            )
            .unwrap();
        }
    }

    #[test]
    fn secrets_are_long_enough_to_sign_with() {
        let secret = gen_secret();
        assert_eq!(URL_SAFE_NO_PAD.decode(&secret).unwrap().len(), 32);
        assert!(TokenVerifier::new(secret.into_bytes()).is_ok());
        assert_ne!(gen_secret(), gen_secret());
    }

    #[test]
    fn assign_and_roster_round_trip_through_the_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path());

        exec(
            tmp.path(),
            &["assign", "--admin", "ada@example.com", "tom@example.com", "pat@example.com"],
        )
        .unwrap();
        let roster = exec(
            tmp.path(),
            &["roster", "--admin", "ada@example.com", "tom@example.com"],
        )
        .unwrap();
        assert_eq!(roster.lines().count(), 2);
        assert!(!roster.contains("(no patients)"));

        exec(
            tmp.path(),
            &["unassign", "--admin", "ada@example.com", "tom@example.com", "pat@example.com"],
        )
        .unwrap();
        let roster = exec(
            tmp.path(),
            &["roster", "--admin", "ada@example.com", "tom@example.com"],
        )
        .unwrap();
        assert!(roster.contains("(no patients)"));
    }

    #[test]
    fn only_admins_may_act_as_admin() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path());

        let err = exec(tmp.path(), &["users", "list", "--admin", "tom@example.com"]).unwrap_err();
        assert!(err.to_string().contains("is not an admin"));

        let listed = exec(tmp.path(), &["users", "list", "--admin", "ada@example.com"]).unwrap();
        assert_eq!(listed.lines().count(), 3);
    }

    #[test]
    fn issued_tokens_verify() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path());

        let token = exec(
            tmp.path(),
            &["token", "pat@example.com", "--secret", SECRET],
        )
        .unwrap();
        let identity = TokenVerifier::new(SECRET).unwrap().verify(token.trim()).unwrap();
        assert_eq!(identity.role, Role::Patient);
    }

    #[test]
    fn token_lifetime_is_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        seed(tmp.path());

        for hours in ["0", "9223372036854775807"] {
            let err = exec(
                tmp.path(),
                &["token", "pat@example.com", "--secret", SECRET, "--hours", hours],
            )
            .unwrap_err();
            assert!(err.to_string().contains("token lifetime"), "{hours}: {err}");
        }
    }
}
