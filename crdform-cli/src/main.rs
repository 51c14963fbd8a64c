use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use crdform_core::differ::{binding_map, create_plan, sort_resources_by_dependencies};
use crdform_core::effect::Effect;
use crdform_core::interpreter::{EffectOutcome, Interpreter, InterpreterConfig};
use crdform_core::parser::{self, ParsedFile};
use crdform_core::plan::Plan;
use crdform_core::provider::Provider;
use crdform_core::resource::{Bindings, Resource, ResourceId, Value};
use crdform_core::schema::{AttributeSchema, AttributeType};
use crdform_provider_k8s::{K8sProvider, PROVIDER_NAME, ValidationError, terraform_type_name};
use crdform_state::{BackendConfig, ManifestRecord, StateBackend, StateFile, create_backend};

const DEFAULT_CONFIG: &str = "main.crdform";

#[derive(Parser)]
#[command(name = "crdform")]
#[command(about = "Render Kubernetes custom resources from declarative configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Render manifests and record them in state
    Apply {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Forget every resource recorded in state
    Destroy {
        /// Path to configuration file
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Print stored manifests as a YAML stream
    Show {
        /// Path to configuration file (for the backend block)
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Only print this resource (type.name)
        #[arg(long)]
        resource: Option<String>,
    },
    /// List resource types or describe one
    Schema {
        /// Resource type (e.g., k8s.cilium_io_cilium_network_policy_v2)
        resource_type: Option<String>,
    },
    /// Remove a state lock left behind by an interrupted run
    ForceUnlock {
        /// ID of the lock to remove
        lock_id: String,

        /// Path to configuration file (for the backend block)
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("CRDFORM_LOG", "warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file, auto_approve } => run_apply(&file, auto_approve).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Show { file, resource } => run_show(&file, resource.as_deref()).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::ForceUnlock { lock_id, file } => run_force_unlock(&file, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_configuration(file: &Path) -> Result<ParsedFile, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    parser::parse_and_resolve(&content).map_err(|e| format!("Parse error: {}", e))
}

fn build_provider(parsed: &ParsedFile) -> K8sProvider {
    for config in &parsed.providers {
        if config.name != PROVIDER_NAME {
            log::warn!("Ignoring configuration for unknown provider '{}'", config.name);
        }
    }

    let provider = K8sProvider::new();
    match parsed
        .provider(PROVIDER_NAME)
        .and_then(|p| p.get_string("default_namespace"))
    {
        Some(namespace) => provider.with_default_namespace(namespace),
        None => provider,
    }
}

fn backend_config(parsed: &ParsedFile) -> BackendConfig {
    parsed
        .backend
        .as_ref()
        .map(BackendConfig::from)
        .unwrap_or_else(BackendConfig::local)
}

/// Backend named by the configuration file, or the local default when there is none
fn backend_for(file: &Path) -> Result<Box<dyn StateBackend>, String> {
    let config = if file.exists() {
        backend_config(&load_configuration(file)?)
    } else {
        BackendConfig::local()
    };
    create_backend(&config).map_err(|e| e.to_string())
}

async fn read_state_file(backend: &dyn StateBackend) -> Result<StateFile, String> {
    let state = backend
        .load()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;
    Ok(state.unwrap_or_default())
}

/// Validate every resource, reporting all violations at once
fn validate_resources(provider: &K8sProvider, resources: &[Resource]) -> Result<Vec<Resource>, String> {
    let mut validated = Vec::new();
    let mut all_errors = Vec::new();

    for resource in resources {
        match provider.validate_resource(resource) {
            Ok(normalized) => validated.push(normalized),
            Err(ValidationError::Invalid { id, errors }) => {
                for error in errors {
                    all_errors.push(format!("{}: {}", id, error));
                }
            }
            Err(e) => all_errors.push(format!("{}: {}", resource.id, e)),
        }
    }

    if all_errors.is_empty() {
        Ok(validated)
    } else {
        Err(format!(
            "{} validation error(s):\n  {}",
            all_errors.len(),
            all_errors.join("\n  ")
        ))
    }
}

/// Diff validated resources against stored state
///
/// References to resources that will not change are resolved from state;
/// references to computed attributes of resources being created or updated
/// stay deferred until apply.
fn build_plan(resources: &[Resource], state_file: &StateFile) -> (Plan, Bindings) {
    let current_states = state_file.current_states();
    let sorted = sort_resources_by_dependencies(resources);
    let bindings = binding_map(&sorted, &current_states);
    let desired: Vec<Resource> = sorted.iter().map(|r| r.resolved(&bindings)).collect();
    (create_plan(&desired, &current_states), bindings)
}

fn run_validate(file: &Path) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let provider = build_provider(&parsed);

    println!("{}", "Validating...".cyan());

    let resources = validate_resources(&provider, &parsed.resources)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );

    for resource in &resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let provider = build_provider(&parsed);
    let resources = validate_resources(&provider, &parsed.resources)?;

    let backend = create_backend(&backend_config(&parsed)).map_err(|e| e.to_string())?;
    let state_file = read_state_file(backend.as_ref()).await?;

    let (plan, _) = build_plan(&resources, &state_file);
    print_plan(&plan, &provider);
    Ok(())
}

async fn run_apply(file: &Path, auto_approve: bool) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let provider = build_provider(&parsed);
    let resources = validate_resources(&provider, &parsed.resources)?;

    let backend = create_backend(&backend_config(&parsed)).map_err(|e| e.to_string())?;
    let lock = backend
        .lock("apply")
        .await
        .map_err(|e| format!("Failed to acquire state lock: {}", e))?;

    let result = apply_locked(backend.as_ref(), provider, &resources, auto_approve).await;

    let released = backend
        .unlock(&lock)
        .await
        .map_err(|e| format!("Failed to release state lock {}: {}", lock.id, e));
    result.and(released)
}

async fn apply_locked(
    backend: &dyn StateBackend,
    provider: K8sProvider,
    resources: &[Resource],
    auto_approve: bool,
) -> Result<(), String> {
    let mut state_file = read_state_file(backend).await?;
    let (plan, bindings) = build_plan(resources, &state_file);

    if plan.is_empty() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan, &provider);
    println!();

    if !auto_approve && !confirm("Do you want to apply these changes?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    execute_plan(backend, &mut state_file, provider, &plan, bindings).await
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let parsed = load_configuration(file)?;
    let provider = build_provider(&parsed);

    let backend = create_backend(&backend_config(&parsed)).map_err(|e| e.to_string())?;
    let lock = backend
        .lock("destroy")
        .await
        .map_err(|e| format!("Failed to acquire state lock: {}", e))?;

    let result = destroy_locked(backend.as_ref(), provider, auto_approve).await;

    let released = backend
        .unlock(&lock)
        .await
        .map_err(|e| format!("Failed to release state lock {}: {}", lock.id, e));
    result.and(released)
}

async fn destroy_locked(
    backend: &dyn StateBackend,
    provider: K8sProvider,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state_file = read_state_file(backend).await?;
    let plan = create_plan(&[], &state_file.current_states());

    if plan.is_empty() {
        println!("{}", "No resources in state.".yellow());
        return Ok(());
    }

    print_plan(&plan, &provider);
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    execute_plan(backend, &mut state_file, provider, &plan, Bindings::new()).await
}

/// Run a plan through the interpreter and record every outcome in state
async fn execute_plan(
    backend: &dyn StateBackend,
    state_file: &mut StateFile,
    provider: K8sProvider,
    plan: &Plan,
    bindings: Bindings,
) -> Result<(), String> {
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let interpreter = Interpreter::new(provider)
        .with_config(InterpreterConfig {
            dry_run: false,
            continue_on_error: true,
        })
        .with_bindings(bindings);
    let result = interpreter.apply(plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(EffectOutcome::Created { state } | EffectOutcome::Updated { state }) => {
                let record = ManifestRecord::from_state(state).map_err(|e| e.to_string())?;
                state_file.insert(record);
                println!("  {} {}", "✓".green(), effect);
            }
            Ok(EffectOutcome::Deleted { state }) => {
                state_file.remove(&state.id);
                println!("  {} {}", "✓".green(), effect);
            }
            Ok(EffectOutcome::Skipped { reason }) => {
                println!("  {} {} ({})", "-".normal(), effect, reason);
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), effect, e);
            }
        }
    }

    state_file.advance();
    backend
        .save(state_file)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", result.success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        println!(
            "{}",
            format!(
                "Apply failed. {} succeeded, {} failed.",
                result.success_count, result.failure_count
            )
            .red()
            .bold()
        );
        Err(format!(
            "{} of {} changes failed",
            result.failure_count,
            plan.effects().len()
        ))
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.bold());
    print!("  Only 'yes' will be accepted: ");
    io::stdout()
        .flush()
        .map_err(|e| format!("Failed to write prompt: {}", e))?;

    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .map_err(|e| format!("Failed to read answer: {}", e))?;
    Ok(answer.trim() == "yes")
}

async fn run_show(file: &Path, resource: Option<&str>) -> Result<(), String> {
    let backend = backend_for(file)?;
    let Some(state_file) = backend
        .load()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?
    else {
        println!("{}", format!("No state at {}.", backend.location()).yellow());
        return Ok(());
    };

    match resource {
        Some(address) => {
            let address = address.strip_prefix("k8s.").unwrap_or(address);
            let record = address
                .split_once('.')
                .and_then(|(resource_type, name)| {
                    state_file.get(&ResourceId::new(resource_type, name))
                })
                .ok_or_else(|| format!("Resource {} not found in state", address))?;
            print!("{}", record.document());
        }
        None => print!("{}", state_file.manifest_stream()),
    }

    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let types = K8sProvider::new().resource_types();

    let Some(requested) = resource_type else {
        println!("{}", "Resource types:".cyan().bold());
        for resource_type in &types {
            let kind = resource_type.manifest_kind();
            let scope = if resource_type.namespaced() { "" } else { " (cluster-scoped)" };
            println!(
                "  • {}.{}  {} {}{}",
                PROVIDER_NAME,
                resource_type.name(),
                kind.api_version,
                kind.kind,
                scope
            );
        }
        return Ok(());
    };

    let name = requested
        .strip_prefix("k8s.")
        .or_else(|| requested.strip_prefix("k8s_"))
        .unwrap_or(requested);
    let resource_type = types
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| format!("Unknown resource type: {}", requested))?;
    let kind = resource_type.manifest_kind();
    let schema = resource_type.schema();

    println!(
        "{}",
        format!("{}.{}", PROVIDER_NAME, resource_type.name()).cyan().bold()
    );
    println!("  {} {}", kind.api_version, kind.kind);
    println!("  type: {}", terraform_type_name(resource_type.name()));
    if let Some(description) = &schema.description {
        println!("  {}", description);
    }
    println!();
    print_attributes(schema.attributes.values(), 1);
    Ok(())
}

fn print_attributes<'a>(attributes: impl Iterator<Item = &'a AttributeSchema>, depth: usize) {
    let indent = "  ".repeat(depth);
    for attr in attributes {
        let flag = if attr.required {
            " required".yellow().to_string()
        } else if attr.computed {
            " computed".dimmed().to_string()
        } else {
            String::new()
        };
        let yaml_name = if attr.yaml_key() != attr.name {
            format!(" ({})", attr.yaml_key())
        } else {
            String::new()
        };
        println!(
            "{}{}{}: {}{}",
            indent,
            attr.name.bold(),
            yaml_name,
            attr.attr_type,
            flag
        );

        let nested = match attr.attr_type.base() {
            AttributeType::Object(fields) => Some(fields),
            AttributeType::List(inner) => match inner.base() {
                AttributeType::Object(fields) => Some(fields),
                _ => None,
            },
            _ => None,
        };
        if let Some(fields) = nested {
            print_attributes(fields.iter(), depth + 1);
        }
    }
}

async fn run_force_unlock(file: &Path, lock_id: &str) -> Result<(), String> {
    let backend = backend_for(file)?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to unlock state: {}", e))?;
    println!("{}", format!("Lock {} removed.", lock_id).green());
    Ok(())
}

fn print_plan(plan: &Plan, provider: &K8sProvider) {
    if plan.is_empty() {
        println!("{}", "No changes. Manifests are up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Create(resource) => {
                println!("  {} {}", "+".green().bold(), resource.id);
                match preview(provider, resource) {
                    Some(yaml) => {
                        for line in yaml.lines() {
                            println!("      {}", line.green());
                        }
                    }
                    None => println!("      {}", "(manifest known after apply)".dimmed()),
                }
            }
            Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            } => {
                println!(
                    "  {} {} ({})",
                    "~".yellow().bold(),
                    id,
                    changed_attributes.join(", ")
                );
                match (from.yaml(), preview(provider, to)) {
                    (Some(old), Some(new)) => print_yaml_diff(old, &new),
                    _ => println!("      {}", "(manifest known after apply)".dimmed()),
                }
            }
            Effect::Delete(state) => {
                println!("  {} {}", "-".red().bold(), state.id);
            }
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// Rendered manifest for display; `None` while references are still deferred
fn preview(provider: &K8sProvider, resource: &Resource) -> Option<String> {
    if resource.attributes.values().any(Value::has_unresolved_refs) {
        return None;
    }
    match provider.preview_yaml(resource) {
        Ok(yaml) => Some(yaml),
        Err(e) => {
            log::warn!("Could not preview {}: {}", resource.id, e);
            None
        }
    }
}

fn print_yaml_diff(old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for change in diff.iter_all_changes() {
        let line = change.to_string_lossy();
        let line = line.trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("    {} {}", "-".red(), line.red()),
            ChangeTag::Insert => println!("    {} {}", "+".green(), line.green()),
            ChangeTag::Equal => println!("      {}", line),
        }
    }
}
