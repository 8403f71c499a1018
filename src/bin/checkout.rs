use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use clubpass::{
    directory::{MemberDirectory, PassKitDirectory},
    domain::MemberStatus,
    service::transition_service::TransitionService,
    telemetry,
};

/// Move every member in one status to another (by default: check out
/// everyone still checked in).
#[derive(Parser, Debug)]
#[command(name = "checkout")]
struct Args {
    /// Status to sweep
    #[arg(long, default_value = "CHECKED_IN")]
    from: String,

    /// Status to move members to
    #[arg(long, default_value = "CHECKED_OUT")]
    to: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} (yes/no): ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init("clubpass=info");
    let settings = telemetry::load_settings()?;

    let source = MemberStatus::parse(&args.from);
    let target = MemberStatus::parse(&args.to);

    let directory: Arc<dyn MemberDirectory> = Arc::new(PassKitDirectory::new(settings.passkit)?);
    let service = TransitionService::new(directory);

    println!("📡 Fetching {} members...", source);
    let snapshot = service.snapshot(&source).await?;

    if snapshot.is_empty() {
        println!("✅ No members are currently {}.", source);
        return Ok(());
    }

    println!("\n📋 Found {} members:\n", snapshot.len());
    for (i, member) in snapshot.iter().enumerate() {
        println!("   {}. {}", i + 1, member.display_name());
    }

    if !args.yes && !confirm(&format!("\nMove all {} members to {}?", snapshot.len(), target))? {
        println!("❌ Cancelled.");
        return Ok(());
    }

    let report = service.run_on(&source, &target, snapshot).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n✅ Moved {}/{} members to {}", report.succeeded, report.total, target);
        for failure in &report.failures {
            println!("   ❌ {} ({}): {}", failure.display_name, failure.member_id, failure.reason);
        }
    }

    if !report.is_clean() {
        std::process::exit(2);
    }
    Ok(())
}
