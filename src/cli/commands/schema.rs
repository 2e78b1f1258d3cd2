//! `udyam schema` - inspect and check form schemas
//!
//! `show` prints the rules the validator derives for every field, which is
//! the quickest way to see what a name heuristic picked up.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{truncate_str, Context};
use crate::cli::GlobalOpts;
use crate::schema::{FieldRule, RuleKind, SchemaRegistry, DEFAULT_SCHEMA};

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// List the steps of the active schema and the embedded schemas
    List,

    /// Show the fields and derived rules of one step
    Show(ShowArgs),

    /// Check a schema file (default: the active schema)
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Step number (1-based)
    pub step: u32,

    /// Print the step's JSON instead of the rule table
    #[arg(long)]
    pub raw: bool,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Schema file to check
    pub path: Option<PathBuf>,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SchemaCommands::List => list_steps(global),
        SchemaCommands::Show(args) => show_step(args, global),
        SchemaCommands::Check(args) => check_schema(args, global),
    }
}

fn list_steps(global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load();
    let schema = ctx.load_schema(global)?;
    let origin = ctx
        .schema_path(global)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("{} (embedded)", DEFAULT_SCHEMA));

    println!("Schema: {}", style(origin).cyan());
    println!("Source: {}", schema.source);
    println!("Captured: {}\n", schema.scraped_at.format("%Y-%m-%d %H:%M UTC"));

    println!("{:<6} {:<45} {}", "STEP", "NAME", "FIELDS");
    println!("{}", "-".repeat(60));
    for step in &schema.steps {
        println!(
            "{:<6} {:<45} {}",
            step.step,
            truncate_str(&step.name, 45),
            step.visible_fields().count()
        );
    }

    if !global.quiet {
        println!("\nEmbedded schemas:");
        for name in SchemaRegistry::new().names() {
            println!("  {}", name);
        }
        println!("\nUse 'udyam schema show <step>' for field details");
    }
    Ok(())
}

fn show_step(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let schema = Context::load().load_schema(global)?;

    let Some(step) = schema.step(args.step) else {
        return Err(miette::miette!(
            help = format!("valid steps are 1 to {}", schema.step_count()),
            "Unknown step: {}",
            args.step
        ));
    };

    if args.raw {
        println!("{}", serde_json::to_string_pretty(step).into_diagnostic()?);
        return Ok(());
    }

    println!("Step {}: {}", step.step, style(&step.name).bold());
    println!();

    let mut builder = Builder::default();
    builder.push_record(["FIELD", "LABEL", "TYPE", "RULE", "FORMAT"]);

    for field in step.visible_fields() {
        let rule = FieldRule::for_field(field);
        let kind = match rule.kind {
            RuleKind::RequiredText => "required",
            RuleKind::RequiredCheckbox => "must be checked",
            RuleKind::OptionalText => "optional",
        };
        let format = rule
            .format
            .as_ref()
            .map(|f| format!("{}  ({})", f.pattern(), f.message()))
            .unwrap_or_else(|| "-".to_string());

        builder.push_record([
            rule.field_name.clone(),
            truncate_str(&rule.label, 30),
            field.field_type.to_string(),
            kind.to_string(),
            format,
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));

    let hidden = step.fields.iter().filter(|f| f.is_hidden()).count();
    if hidden > 0 && !global.quiet {
        println!(
            "\n{} hidden field(s) are not shown or validated",
            style(hidden).dim()
        );
    }
    Ok(())
}

fn check_schema(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let path = args.path.or_else(|| Context::load().schema_path(global));
    let registry = SchemaRegistry::new();
    let schema = registry.load(path.as_deref())?;

    let name = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
    let fields: usize = schema.steps.iter().map(|s| s.visible_fields().count()).sum();

    println!(
        "{} {} is valid ({} steps, {} fields)",
        style("✓").green().bold(),
        name,
        schema.step_count(),
        fields
    );
    Ok(())
}
