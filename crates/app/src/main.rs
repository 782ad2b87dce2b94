//! Coupons CLI

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use coupons::prelude::{CouponCode, CouponDiscount, CouponError, CouponUuid, DiscountKind};
use coupons_app::{
    config::AppConfig,
    context::{AppContext, AppInitError},
    domain::coupons::{CouponsServiceError, StoreError, data::NewCoupon},
    observability::{self, ObservabilityError},
};
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "coupons", about = "Coupon validation and application", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Preview the discounts a batch of codes would give an order
    Validate(OrderArgs),

    /// Validate a batch of codes and record their usage against an order
    Apply(OrderArgs),

    /// Show how often a coupon has been used
    Usage(UsageArgs),

    /// Manage coupons
    Coupon(CouponCommand),
}

#[derive(Debug, Args)]
struct OrderArgs {
    /// Coupon code; repeat for stacked coupons
    #[arg(long = "code", required = true)]
    codes: Vec<String>,

    /// Order amount before discounts
    #[arg(long)]
    amount: Decimal,
}

#[derive(Debug, Args)]
struct UsageArgs {
    /// Coupon code
    #[arg(long)]
    code: String,
}

#[derive(Debug, Args)]
struct CouponCommand {
    #[command(subcommand)]
    command: CouponSubcommand,
}

#[derive(Debug, Subcommand)]
enum CouponSubcommand {
    /// Create a coupon
    Create(CreateCouponArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Percentage,
    Fixed,
}

impl From<KindArg> for DiscountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Percentage => Self::Percentage,
            KindArg::Fixed => Self::Fixed,
        }
    }
}

#[derive(Debug, Args)]
struct CreateCouponArgs {
    /// Coupon code, stored upper-case
    #[arg(long)]
    code: CouponCode,

    /// Discount kind
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Percentage (0-100] or fixed amount (> 0)
    #[arg(long)]
    value: Decimal,

    /// Expiry instant, e.g. 2026-12-31T23:59:59Z
    #[arg(long)]
    expires_at: Option<Timestamp>,

    /// Maximum number of applications; unlimited when omitted
    #[arg(long)]
    usage_limit: Option<u64>,

    /// Allow combining with other coupons
    #[arg(long)]
    stackable: bool,

    /// Create the coupon disabled
    #[arg(long)]
    inactive: bool,

    /// Free-form description
    #[arg(long, default_value = "")]
    description: String,

    /// Who created the coupon
    #[arg(long, env = "USER", default_value = "cli")]
    created_by: String,

    /// Optional coupon UUID; generated when omitted
    #[arg(long)]
    uuid: Option<Uuid>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    #[error(transparent)]
    Init(#[from] AppInitError),

    #[error(transparent)]
    Coupons(#[from] CouponsServiceError),

    #[error("invalid coupon: {0}")]
    InvalidCoupon(#[from] CouponError),

    #[error("failed to create coupon: {0}")]
    CreateCoupon(#[source] StoreError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    observability::init_subscriber(&cli.config.logging)?;

    let ctx = AppContext::from_config(&cli.config).await?;

    match cli.command {
        Commands::Validate(args) => {
            let plan = ctx.coupons.validate(&args.codes, args.amount).await?;

            print_json(&plan)
        }
        Commands::Apply(args) => {
            let plan = ctx.coupons.validate(&args.codes, args.amount).await?;
            let result = ctx.coupons.apply(&plan, args.amount).await?;

            print_json(&result)
        }
        Commands::Usage(args) => {
            let summary = ctx.coupons.usage_summary(&args.code).await?;

            print_json(&summary)
        }
        Commands::Coupon(CouponCommand {
            command: CouponSubcommand::Create(args),
        }) => create_coupon(&ctx, args).await,
    }
}

async fn create_coupon(ctx: &AppContext, args: CreateCouponArgs) -> Result<(), CliError> {
    let discount = CouponDiscount::from_parts(args.kind.into(), args.value)?;

    let coupon = ctx
        .store
        .create_coupon(NewCoupon {
            uuid: args.uuid.map(CouponUuid::from).unwrap_or_default(),
            code: args.code,
            description: args.description,
            discount,
            expires_at: args.expires_at,
            allow_stacking: args.stackable,
            usage_limit: args.usage_limit,
            is_active: !args.inactive,
            created_by: args.created_by,
        })
        .await
        .map_err(CliError::CreateCoupon)?;

    print_json(&coupon)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}
