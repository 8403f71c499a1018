use std::sync::Arc;

use clap::Parser;
use clubpass::{
    directory::{MemberDirectory, PassKitDirectory},
    domain::{EnrollmentStatus, Person},
    service::enrollment_service::EnrollmentService,
    telemetry,
};

/// Enroll one person, unless they are already a member.
#[derive(Parser, Debug)]
#[command(name = "enroll")]
struct Args {
    #[arg(long)]
    first: String,

    #[arg(long)]
    last: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    phone: Option<String>,

    /// Membership type recorded on the pass
    #[arg(long)]
    membership_type: Option<String>,

    /// Provenance tag stored with the member
    #[arg(long, default_value = "manual")]
    source: String,

    /// Uniqueness salt (order id, season); defaults to the current time
    #[arg(long)]
    salt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init("clubpass=info");
    let settings = telemetry::load_settings()?;

    let directory: Arc<dyn MemberDirectory> = Arc::new(PassKitDirectory::new(settings.passkit)?);
    let service = EnrollmentService::new(directory, settings.enrollment);

    let mut person = Person::new(args.first, args.last, args.email, args.source);
    person.phone = args.phone;
    person.membership_type = args.membership_type;
    person.salt = args.salt;

    println!("👤 Adding member: {} ({})", person.display_name(), person.email);
    let result = service.enroll(person).await?;

    match result.status {
        EnrollmentStatus::Created => {
            println!("✅ Member created: {}", result.member_id);
            println!("   📧 Welcome email requested");
        }
        EnrollmentStatus::AlreadyExisted => {
            println!("⚠️ Member already exists with ID: {}", result.member_id);
        }
    }
    if let Some(url) = result.pass_url {
        println!("   Pass URL: {}", url);
    }

    Ok(())
}
