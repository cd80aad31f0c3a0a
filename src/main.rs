//! # SCM Provider Generator CLI
//!
//! Runs the ApplicationSet `scmProvider` generator outside the ApplicationSet
//! controller, printing the parameters it would hand to templates.
//!
//! ## Usage
//!
//! ```bash
//! # Generate parameters from a local ApplicationSet or bare scmProvider section
//! scm-provider-generator generate --file appset.yaml --namespace argocd
//!
//! # Run every scmProvider generator of an ApplicationSet in the cluster
//! scm-provider-generator appset services --namespace argocd
//!
//! # Print the JSON schema of the scmProvider section
//! scm-provider-generator schema
//!
//! # Print the ApplicationSet CRD (subset read by this generator)
//! scm-provider-generator crd
//! ```
//!
//! Secrets referenced by provider configurations are read from the cluster
//! of the current kubeconfig context.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use kube::{api::Api, Client, CustomResourceExt};
use serde_json::json;
use std::path::{Path, PathBuf};

use scm_provider_generator::constants::DEFAULT_NAMESPACE;
use scm_provider_generator::crd::{
    ApplicationSet, ApplicationSetGenerator, ApplicationSetSpec, ScmProviderGeneratorSpec,
};
use scm_provider_generator::{Generator, ScmProviderGenerator};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// ApplicationSet SCM provider generator
#[derive(Parser)]
#[command(name = "scm-provider-generator", version, long_version = LONG_VERSION)]
#[command(about = "Generate ApplicationSet parameters from SCM provider repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate parameters from a local YAML file
    Generate {
        /// ApplicationSet manifest or bare scmProvider section
        #[arg(short, long)]
        file: PathBuf,

        /// Namespace holding the referenced Secrets
        /// Defaults to the ApplicationSet's namespace, then "default"
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Run the scmProvider generators of an ApplicationSet in the cluster
    Appset {
        /// ApplicationSet name
        name: String,

        /// Namespace of the ApplicationSet (defaults to the kubeconfig namespace)
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Print the JSON schema of the scmProvider generator section
    Schema,
    /// Print the ApplicationSet CustomResourceDefinition as YAML
    Crd,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any TLS client is built
    // Required for rustls 0.23+ when no default provider is set via features
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scm_provider_generator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { file, namespace } => generate_command(&file, namespace).await,
        Commands::Appset { name, namespace } => appset_command(&name, namespace).await,
        Commands::Schema => {
            let schema = schemars::schema_for!(ScmProviderGeneratorSpec);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Crd => {
            print!("{}", serde_yaml::to_string(&ApplicationSet::crd())?);
            Ok(())
        }
    }
}

async fn kube_client() -> Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")
}

/// Read `path` as an ApplicationSet, or wrap a bare scmProvider section in one
fn load_application_set(path: &Path, namespace: Option<String>) -> Result<ApplicationSet> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: serde_yaml::Value = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML in {}", path.display()))?;

    let is_application_set = document
        .get("kind")
        .and_then(serde_yaml::Value::as_str)
        .is_some_and(|kind| kind == "ApplicationSet");

    let mut app_set = if is_application_set {
        serde_yaml::from_value::<ApplicationSet>(document)
            .with_context(|| format!("Invalid ApplicationSet in {}", path.display()))?
    } else {
        // Accept both `scmProvider: {...}` and the section body itself
        let section = document
            .get("scmProvider")
            .cloned()
            .unwrap_or(document);
        let spec: ScmProviderGeneratorSpec = serde_yaml::from_value(section)
            .with_context(|| format!("Invalid scmProvider section in {}", path.display()))?;
        let name = path
            .file_stem()
            .map_or_else(|| "local".to_string(), |stem| stem.to_string_lossy().into_owned());
        ApplicationSet::new(
            &name,
            ApplicationSetSpec {
                generators: vec![ApplicationSetGenerator {
                    scm_provider: Some(spec),
                }],
                template: Default::default(),
            },
        )
    };

    if let Some(namespace) = namespace {
        app_set.metadata.namespace = Some(namespace);
    }
    if app_set.metadata.namespace.is_none() {
        app_set.metadata.namespace = Some(DEFAULT_NAMESPACE.to_string());
    }
    Ok(app_set)
}

async fn generate_command(file: &Path, namespace: Option<String>) -> Result<()> {
    let app_set = load_application_set(file, namespace)?;
    let generator = ScmProviderGenerator::new(kube_client().await?);
    run_generators(&generator, &app_set).await
}

async fn appset_command(name: &str, namespace: Option<String>) -> Result<()> {
    let client = kube_client().await?;
    let ns = namespace.unwrap_or_else(|| client.default_namespace().to_string());
    let api: Api<ApplicationSet> = Api::namespaced(client.clone(), &ns);
    let app_set = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get ApplicationSet '{ns}/{name}'"))?;

    let generator = ScmProviderGenerator::new(client);
    run_generators(&generator, &app_set).await
}

/// Run every scmProvider generator of `app_set` concurrently and print one JSON result each
async fn run_generators(generator: &ScmProviderGenerator, app_set: &ApplicationSet) -> Result<()> {
    let entries: Vec<(usize, &ApplicationSetGenerator)> = app_set
        .spec
        .generators
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.scm_provider.is_some())
        .collect();
    if entries.is_empty() {
        anyhow::bail!("ApplicationSet has no scmProvider generators");
    }

    let results = join_all(entries.iter().map(|(index, entry)| async move {
        (*index, *entry, generator.generate_params(entry, app_set).await)
    }))
    .await;

    let mut failed = 0;
    for (index, entry, result) in results {
        let output = match result {
            Ok(params) => json!({
                "generator": index,
                "requeueAfterSeconds": generator.requeue_after(entry).as_secs(),
                "params": params,
            }),
            Err(e) => {
                failed += 1;
                json!({
                    "generator": index,
                    "error": e.to_string(),
                })
            }
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    if failed > 0 {
        anyhow::bail!("{failed} generator(s) failed");
    }
    Ok(())
}
