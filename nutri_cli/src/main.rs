use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use nutri_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

/// Exit status when a submission needs `--confirm` before it is saved
const EXIT_NEEDS_CONFIRMATION: u8 = 2;

#[derive(Parser)]
#[command(name = "nutri")]
#[command(about = "Food log with derived nutrition targets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default path
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the daily calorie target for body measurements
    Target {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Health score (0-100) of a nutrient snapshot
    Score {
        #[arg(long)]
        calories: f64,
        #[arg(long)]
        protein: f64,
        #[arg(long)]
        fiber: f64,
        #[arg(long)]
        sugars: f64,
    },

    /// Accounts
    #[command(subcommand)]
    User(UserCommands),

    /// Onboarding and profile edits
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Shared food catalog
    #[command(subcommand)]
    Food(FoodCommands),

    /// Consumption log
    #[command(subcommand)]
    Entry(EntryCommands),
}

#[derive(Args)]
struct BodyArgs {
    #[arg(long)]
    height: f64,

    /// cm or in
    #[arg(long, default_value = "cm")]
    height_unit: String,

    #[arg(long)]
    weight: f64,

    /// kg or lb
    #[arg(long, default_value = "kg")]
    weight_unit: String,

    /// weight_loss, maintain, eat_healthy or weight_gain
    #[arg(long, default_value = "maintain")]
    goal: String,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a regular account
    Signup { username: String },

    /// Make sure an admin account exists
    BootstrapAdmin {
        #[arg(long, default_value = "admin")]
        username: String,
    },

    /// Delete an account and its consumption log (admin)
    Delete {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        username: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show profile completion and current target
    Status {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
    },

    /// Submit body measurements and goal to complete the profile
    Onboard {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,

        #[command(flatten)]
        body: BodyArgs,

        /// Save even if the measurements look unusual
        #[arg(long)]
        confirm: bool,
    },

    /// Change measurements or goal; the target is re-derived
    Update {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,

        /// Profile to edit (admin only; defaults to yourself)
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        height_unit: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        weight_unit: Option<String>,
        #[arg(long)]
        goal: Option<String>,

        /// Save even if the measurements look unusual
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Args)]
struct NutrientArgs {
    #[arg(long)]
    calories: f64,
    #[arg(long)]
    protein: f64,
    #[arg(long)]
    carbs: f64,
    #[arg(long)]
    fat: f64,
    #[arg(long)]
    fiber: f64,
    #[arg(long)]
    sugars: f64,
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food you own
    Add {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        nutrients: NutrientArgs,
        #[arg(long, default_value_t = 0.0)]
        density: f64,
    },

    /// Edit a food (owner or admin)
    Edit {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        name: String,
        #[arg(long)]
        rename: Option<String>,
        #[arg(long)]
        calories: Option<f64>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        #[arg(long)]
        fiber: Option<f64>,
        #[arg(long)]
        sugars: Option<f64>,
        #[arg(long)]
        density: Option<f64>,
    },

    /// Delete a food (owner or admin, only when unreferenced)
    Delete {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        name: String,
    },

    /// List the catalog
    List,

    /// Import system foods from a CSV dataset (admin)
    Import {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// Log a consumption
    Log {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        #[arg(long)]
        food: String,
        #[arg(long, default_value_t = 1.0)]
        portion: f64,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Breakfast, Lunch, Dinner or Snack
        #[arg(long)]
        meal: Option<String>,
        /// Log on behalf of this user (admin only)
        #[arg(long = "for", value_name = "USERNAME")]
        for_user: Option<String>,
    },

    /// List logged entries, newest first
    List {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        #[arg(long = "for", value_name = "USERNAME")]
        for_user: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        meal: Option<String>,
    },

    /// Change portion, date or meal of an entry
    Edit {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        id: Uuid,
        #[arg(long)]
        portion: Option<f64>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        meal: Option<String>,
    },

    /// Delete an entry
    Delete {
        #[arg(long = "as", value_name = "USERNAME")]
        as_user: String,
        id: Uuid,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    nutri_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let open_store = || Store::open(&data_dir, config.plausibility);

    match cli.command {
        Commands::Target { body } => cmd_target(&body, &config.plausibility),
        Commands::Score {
            calories,
            protein,
            fiber,
            sugars,
        } => {
            let nutrients = Nutrients {
                calories,
                protein,
                fiber,
                sugars,
                ..Nutrients::default()
            };
            nutrients.validate()?;
            println!("Health score: {}", nutrients.health_score());
            Ok(ExitCode::SUCCESS)
        }
        Commands::User(cmd) => cmd_user(&open_store()?, cmd),
        Commands::Profile(cmd) => cmd_profile(&open_store()?, cmd),
        Commands::Food(cmd) => cmd_food(&open_store()?, cmd),
        Commands::Entry(cmd) => cmd_entry(&open_store()?, cmd),
    }
}

// ============================================================================
// Input parsing
// ============================================================================

fn parse_body(body: &BodyArgs) -> Result<(Height, Weight, DietaryGoal)> {
    let height = Height::new(body.height, body.height_unit.parse()?);
    let weight = Weight::new(body.weight, body.weight_unit.parse()?);
    let goal = body.goal.parse()?;
    Ok((height, weight, goal))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        Error::InvalidInput(format!("date must be YYYY-MM-DD, got '{}': {}", raw, e))
    })
}

fn parse_optional<T, F>(raw: Option<&str>, parse: F) -> Result<Option<T>>
where
    F: Fn(&str) -> Result<T>,
{
    raw.map(parse).transpose()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve the acting user and confine incomplete profiles to onboarding
fn acting_user(store: &Store, username: &str, feature: Feature) -> Result<User> {
    let user = store.find_user_by_name(username)?;
    gate(&user, feature)?;
    Ok(user)
}

fn user_id_of(store: &Store, username: Option<&str>) -> Result<Option<UserId>> {
    username
        .map(|name| store.find_user_by_name(name).map(|u| u.id))
        .transpose()
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_target(body: &BodyArgs, bounds: &PlausibilityBounds) -> Result<ExitCode> {
    let (height, weight, goal) = parse_body(body)?;
    let preview = preview_target(height, weight, goal, bounds)?;

    println!("Target calories: {} kcal/day", preview.target_calories);
    if preview.requires_confirmation {
        println!("Height/weight look unusual; saving this profile will require --confirm.");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_user(store: &Store, cmd: UserCommands) -> Result<ExitCode> {
    match cmd {
        UserCommands::Signup { username } => {
            let user = store.signup(&username)?;
            println!("✓ Created user {}", user.username);
            println!("  Complete onboarding with `nutri profile onboard --as {}`", user.username);
        }
        UserCommands::BootstrapAdmin { username } => {
            let admin = store.ensure_admin(&username)?;
            println!("✓ Admin account: {}", admin.username);
        }
        UserCommands::Delete { as_user, username } => {
            let actor = acting_user(store, &as_user, Feature::UserAdmin)?.actor();
            let target = store.find_user_by_name(&username)?;
            let (user, removed) = store.delete_user(&actor, target.id)?;
            println!(
                "✓ Deleted user {} and {} consumption entries",
                user.username, removed
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_profile_outcome(outcome: ProfileOutcome) -> ExitCode {
    match outcome {
        ProfileOutcome::Committed { user, change } => {
            println!("✓ Profile saved for {}", user.username);
            println!("  Target calories: {} kcal/day", user.target_calories);
            if let Some(change) = change {
                let fields: Vec<_> = change.changed_fields.keys().cloned().collect();
                println!("  Changed: {}", fields.join(", "));
            }
            ExitCode::SUCCESS
        }
        ProfileOutcome::NeedsConfirmation { preview } => {
            println!("Your height/weight look unusual. Please confirm to continue.");
            println!("  Preview target: {} kcal/day", preview);
            println!("  Re-run with --confirm to save.");
            ExitCode::from(EXIT_NEEDS_CONFIRMATION)
        }
    }
}

fn cmd_profile(store: &Store, cmd: ProfileCommands) -> Result<ExitCode> {
    match cmd {
        ProfileCommands::Status { as_user } => {
            let user = acting_user(store, &as_user, Feature::ProfileStatus)?;
            match user.profile_state() {
                ProfileState::Incomplete => {
                    println!("Profile: incomplete (onboarding required)");
                }
                ProfileState::Complete => {
                    println!("Profile: complete");
                    println!("  Goal: {}", user.dietary_goal);
                    if let (Some(h), Some(w)) = (user.height, user.weight) {
                        println!("  Height: {} {}", h.value, h.unit);
                        println!("  Weight: {} {}", w.value, w.unit);
                    }
                }
            }
            println!("  Target calories: {} kcal/day", user.target_calories);
            Ok(ExitCode::SUCCESS)
        }

        ProfileCommands::Onboard {
            as_user,
            body,
            confirm,
        } => {
            let actor = acting_user(store, &as_user, Feature::Onboarding)?.actor();
            let (height, weight, goal) = parse_body(&body)?;
            let submission = ProfileUpdate::onboarding(height, weight, goal, confirm);
            Ok(report_profile_outcome(store.submit_onboarding(&actor, &submission)?))
        }

        ProfileCommands::Update {
            as_user,
            user,
            height,
            height_unit,
            weight,
            weight_unit,
            goal,
            confirm,
        } => {
            let actor_user = acting_user(store, &as_user, Feature::ProfileEdit)?;
            let target = match user {
                Some(name) => store.find_user_by_name(&name)?,
                None => actor_user.clone(),
            };

            let height_unit = parse_optional(height_unit.as_deref(), |s| s.parse::<HeightUnit>())?;
            let weight_unit = parse_optional(weight_unit.as_deref(), |s| s.parse::<WeightUnit>())?;

            // A bare unit change reinterprets the stored value
            let height = match (height, height_unit) {
                (Some(v), unit) => Some(Height::new(
                    v,
                    unit.or(target.height.map(|h| h.unit)).unwrap_or(HeightUnit::Cm),
                )),
                (None, Some(unit)) => target.height.map(|h| Height::new(h.value, unit)),
                (None, None) => None,
            };
            let weight = match (weight, weight_unit) {
                (Some(v), unit) => Some(Weight::new(
                    v,
                    unit.or(target.weight.map(|w| w.unit)).unwrap_or(WeightUnit::Kg),
                )),
                (None, Some(unit)) => target.weight.map(|w| Weight::new(w.value, unit)),
                (None, None) => None,
            };

            let update = ProfileUpdate {
                height,
                weight,
                dietary_goal: parse_optional(goal.as_deref(), |s| s.parse::<DietaryGoal>())?,
                confirm_unrealistic: confirm,
            };
            let outcome = store.update_profile(&actor_user.actor(), target.id, &update)?;
            Ok(report_profile_outcome(outcome))
        }
    }
}

fn cmd_food(store: &Store, cmd: FoodCommands) -> Result<ExitCode> {
    match cmd {
        FoodCommands::Add {
            as_user,
            name,
            nutrients,
            density,
        } => {
            let actor = acting_user(store, &as_user, Feature::Foods)?.actor();
            let new_food = NewFood {
                name,
                nutrients: Nutrients {
                    calories: nutrients.calories,
                    protein: nutrients.protein,
                    carbs: nutrients.carbs,
                    fat: nutrients.fat,
                    fiber: nutrients.fiber,
                    sugars: nutrients.sugars,
                },
                nutrition_density: density,
            };
            let food = store.create_food(&actor, new_food)?;
            println!("✓ Added food '{}'", food.name);
        }

        FoodCommands::Edit {
            as_user,
            name,
            rename,
            calories,
            protein,
            carbs,
            fat,
            fiber,
            sugars,
            density,
        } => {
            let actor = acting_user(store, &as_user, Feature::Foods)?.actor();
            let food = store.find_food_by_name(&name)?;
            let update = FoodUpdate {
                name: rename,
                calories,
                protein,
                carbs,
                fat,
                fiber,
                sugars,
                nutrition_density: density,
            };
            let food = store.update_food(&actor, food.id, &update)?;
            println!("✓ Updated food '{}'", food.name);
        }

        FoodCommands::Delete { as_user, name } => {
            let actor = acting_user(store, &as_user, Feature::Foods)?.actor();
            let food = store.find_food_by_name(&name)?;
            store.delete_food(&actor, food.id)?;
            println!("✓ Deleted food '{}'", food.name);
        }

        FoodCommands::List => {
            for food in store.list_foods()? {
                let owner = if food.created_by.is_some() { "" } else { " [system]" };
                println!(
                    "{}{}: {} kcal, {}g protein, {}g carbs, {}g fat, {}g fiber, {}g sugars",
                    food.name,
                    owner,
                    food.nutrients.calories,
                    food.nutrients.protein,
                    food.nutrients.carbs,
                    food.nutrients.fat,
                    food.nutrients.fiber,
                    food.nutrients.sugars
                );
            }
        }

        FoodCommands::Import { as_user, path } => {
            let actor = acting_user(store, &as_user, Feature::Foods)?.actor();
            let foods = read_food_csv(&path)?;
            let summary = store.import_foods(&actor, foods)?;
            println!(
                "✓ Imported {} foods ({} skipped)",
                summary.inserted, summary.skipped
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_entry(store: &Store, cmd: EntryCommands) -> Result<ExitCode> {
    match cmd {
        EntryCommands::Log {
            as_user,
            food,
            portion,
            date,
            meal,
            for_user,
        } => {
            let actor = acting_user(store, &as_user, Feature::Consumption)?.actor();
            let food = store.find_food_by_name(&food)?;
            let date = parse_optional(date.as_deref(), parse_date)?.unwrap_or_else(today);
            let meal = parse_optional(meal.as_deref(), |s| s.parse::<MealType>())?;
            let for_user = user_id_of(store, for_user.as_deref())?;

            let entry = store.log_entry(&actor, for_user, food.id, portion, date, meal, today())?;
            println!("✓ Logged {} x{} on {}", food.name, entry.portion, entry.date);
            println!("  Calories: {:.0} kcal", entry.nutrients.calories);
            println!("  Health score: {}", entry.health_score);
            println!("  Entry id: {}", entry.id);
        }

        EntryCommands::List {
            as_user,
            for_user,
            date,
            meal,
        } => {
            let actor = acting_user(store, &as_user, Feature::Consumption)?.actor();
            let for_user = user_id_of(store, for_user.as_deref())?;
            let date = parse_optional(date.as_deref(), parse_date)?;
            let meal = parse_optional(meal.as_deref(), |s| s.parse::<MealType>())?;

            let db = store.read()?;
            for entry in db.entries_for(&actor, for_user, date, meal)? {
                let food_name = db
                    .food(entry.food_id)
                    .map(|f| f.name.as_str())
                    .unwrap_or("?");
                let meal = entry
                    .meal_type
                    .map(|m| format!("{:?}", m))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{}  {}  {:<9}  {} x{}  {:.0} kcal  score {}",
                    entry.id,
                    entry.date,
                    meal,
                    food_name,
                    entry.portion,
                    entry.nutrients.calories,
                    entry.health_score
                );
            }
        }

        EntryCommands::Edit {
            as_user,
            id,
            portion,
            date,
            meal,
        } => {
            let actor = acting_user(store, &as_user, Feature::Consumption)?.actor();
            let update = EntryUpdate {
                portion,
                date: parse_optional(date.as_deref(), parse_date)?,
                meal_type: parse_optional(meal.as_deref(), |s| s.parse::<MealType>())?,
            };
            let entry = store.update_entry(&actor, id, &update, today())?;
            println!("✓ Updated entry {}", entry.id);
            println!("  Health score: {}", entry.health_score);
        }

        EntryCommands::Delete { as_user, id } => {
            let actor = acting_user(store, &as_user, Feature::Consumption)?.actor();
            let entry = store.delete_entry(&actor, id)?;
            println!("✓ Deleted entry {}", entry.id);
        }
    }
    Ok(ExitCode::SUCCESS)
}
