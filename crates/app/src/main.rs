use clap::{Args, Parser, Subcommand};
use ledger::{Category, DbStore, Manager, Pence, Storer};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

type ResultApp<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "householder")]
#[command(about = "Keep track of shared household expenses")]
struct Cli {
    /// Settings file (defaults to `householder.toml` when present).
    #[arg(long, env = "HOUSEHOLDER_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Group(GroupCommand),
    #[command(subcommand)]
    Expense(ExpenseCommand),
    #[command(subcommand)]
    Payment(PaymentCommand),
    /// Show who owes whom in a group.
    Balances(GroupArgs),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    admin: bool,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create(GroupCreateArgs),
    /// List every group, or the groups of one user.
    List(GroupListArgs),
    AddMember(MemberArgs),
    RemoveMember(MemberArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct GroupListArgs {
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct GroupArgs {
    #[arg(long)]
    group: i64,
}

#[derive(Args, Debug)]
struct MemberArgs {
    #[arg(long)]
    group: i64,
    #[arg(long)]
    email: String,
    #[arg(long)]
    admin: bool,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(ExpenseAddArgs),
    List(GroupArgs),
    Delete(ExpenseDeleteArgs),
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    group: i64,
    /// Email of the member who paid.
    #[arg(long)]
    payer: String,
    /// Amount in pounds, e.g. `12.50`.
    #[arg(long, value_parser = parse_pence)]
    amount: Pence,
    #[arg(long, value_parser = parse_category)]
    category: Category,
    #[arg(long, default_value = "")]
    description: String,
    /// Emails of the members sharing the expense, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    participants: Vec<String>,
}

#[derive(Args, Debug)]
struct ExpenseDeleteArgs {
    #[arg(long)]
    id: i64,
}

#[derive(Subcommand, Debug)]
enum PaymentCommand {
    Add(PaymentAddArgs),
}

#[derive(Args, Debug)]
struct PaymentAddArgs {
    #[arg(long)]
    group: i64,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long, value_parser = parse_pence)]
    amount: Pence,
}

fn parse_pence(raw: &str) -> Result<Pence, String> {
    Pence::parse(raw).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<Category, String> {
    let category = Category::from(raw);
    category.validate().map_err(|err| err.to_string())?;
    Ok(category)
}

#[tokio::main]
async fn main() -> ResultApp<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "householder={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let store = DbStore::builder().database(db).build().await?;
    let manager = Manager::new(store);

    match cli.command {
        Command::User(UserCommand::Create(args)) => {
            let mut user = ledger::User::new(&args.email, args.admin, true);
            manager.store().insert_user(&mut user).await?;
            println!("created user {} ({})", user.id, user.email);
        }
        Command::Group(command) => group(&manager, command).await?,
        Command::Expense(command) => expense(&manager, command).await?,
        Command::Payment(PaymentCommand::Add(args)) => {
            let group = manager.group_by_id(args.group).await?;
            let giver = manager.user_by_email(&args.from).await?;
            let receiver = manager.user_by_email(&args.to).await?;
            let payment = manager
                .insert_payment(&group, giver.id, receiver.id, args.amount)
                .await?;
            println!(
                "recorded payment {}: {} paid {} {}",
                payment.id, giver.email, receiver.email, payment.amount
            );
        }
        Command::Balances(args) => balances(&manager, args.group).await?,
    }

    Ok(())
}

async fn group(manager: &Manager<DbStore>, command: GroupCommand) -> ResultApp<()> {
    match command {
        GroupCommand::Create(args) => {
            let group = manager.new_group(&args.name).await?;
            println!("created group {} ({})", group.id, group.name);
        }
        GroupCommand::List(args) => {
            let groups = match args.email {
                Some(email) => {
                    let user = manager.user_by_email(&email).await?;
                    manager.user_groups(&user).await?
                }
                None => manager.groups().await?,
            };
            for group in groups {
                println!("{:>5}  {}", group.id, group.name);
            }
        }
        GroupCommand::AddMember(args) => {
            let group = manager.group_by_id(args.group).await?;
            let user = manager.user_by_email(&args.email).await?;
            manager.add_user_to_group(&group, &user, args.admin).await?;
            println!("added {} to {}", user.email, group.name);
        }
        GroupCommand::RemoveMember(args) => {
            let group = manager.group_by_id(args.group).await?;
            let user = manager.user_by_email(&args.email).await?;
            manager.remove_user_from_group(&group, &user).await?;
            println!("removed {} from {}", user.email, group.name);
        }
    }
    Ok(())
}

async fn expense(manager: &Manager<DbStore>, command: ExpenseCommand) -> ResultApp<()> {
    match command {
        ExpenseCommand::Add(args) => {
            let group = manager.group_by_id(args.group).await?;
            let payer = manager.user_by_email(&args.payer).await?;
            let mut participant_ids = Vec::with_capacity(args.participants.len());
            for email in &args.participants {
                participant_ids.push(manager.user_by_email(email).await?.id);
            }

            let expense = manager
                .new_expense(
                    &group,
                    args.amount,
                    payer.id,
                    args.category,
                    &args.description,
                    &participant_ids,
                )
                .await?;
            println!("recorded expense {} ({})", expense.id, expense.amount);
            for assignment in &expense.assignments {
                let user = manager.user_by_id(assignment.user_id).await?;
                println!("  {:<30} {}", user.email, assignment.amount);
            }
        }
        ExpenseCommand::List(args) => {
            let group = manager.group_by_id(args.group).await?;
            for expense in manager.group_expenses(&group).await? {
                println!(
                    "{:>5}  {}  {:>10}  {:<16} {}",
                    expense.id,
                    expense.created_at.format("%Y-%m-%d"),
                    expense.amount.to_string(),
                    expense.category.to_string(),
                    expense.description
                );
            }
        }
        ExpenseCommand::Delete(args) => {
            let expense = manager.expense_by_id(args.id).await?;
            manager.delete_expense(&expense).await?;
            println!("deleted expense {}", expense.id);
        }
    }
    Ok(())
}

async fn balances(manager: &Manager<DbStore>, group_id: i64) -> ResultApp<()> {
    let group = manager.group_by_id(group_id).await?;
    let balances = manager.group_balances(&group).await?;

    println!("balances for {}", group.name);
    for (user_id, amount) in balances.iter() {
        let user = manager.user_by_id(user_id).await?;
        println!("  {:<30} {:>10}", user.email, amount.to_string());
    }

    let settlements = balances.settlements();
    if settlements.is_empty() {
        println!("all settled");
    }
    for settlement in settlements {
        let from = manager.user_by_id(settlement.from).await?;
        let to = manager.user_by_id(settlement.to).await?;
        println!("  {} pays {} {}", from.email, to.email, settlement.amount);
    }
    Ok(())
}

async fn parse_database(config: &Database) -> ResultApp<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::debug!(?config, "database migrated");
    Ok(database)
}
