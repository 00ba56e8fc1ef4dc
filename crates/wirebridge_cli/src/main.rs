//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire a small sample application through `wirebridge_core` end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `wirebridge_cli [config.json]`

use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wirebridge_core::{
    init_logging, Bridge, Component, ComponentContext, Environment, HealthCheck, HealthStatus,
    LifecycleError, LoggingOptions, Managed, ServerInfo, Task, TaskError, TaskParameters,
    WiringSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct ExampleConfiguration {
    name: String,
    host: String,
    port: u16,
    pool_size: usize,
    /// Absolute directory; file logging stays off when unset.
    log_dir: Option<String>,
}

impl Default for ExampleConfiguration {
    fn default() -> Self {
        Self {
            name: "example".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            pool_size: 4,
            log_dir: None,
        }
    }
}

struct ConnectionPool {
    size: usize,
    open: AtomicUsize,
}

impl Managed for ConnectionPool {
    fn start(&self) -> Result<(), LifecycleError> {
        self.open.store(self.size, Ordering::SeqCst);
        info!("event=pool_start module=cli connections={}", self.size);
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.open.store(0, Ordering::SeqCst);
        info!("event=pool_stop module=cli");
        Ok(())
    }
}

struct PoolHealth {
    pool: Arc<ConnectionPool>,
}

impl HealthCheck for PoolHealth {
    fn check(&self) -> HealthStatus {
        match self.pool.open.load(Ordering::SeqCst) {
            0 => HealthStatus::unhealthy("no open connections"),
            _ => HealthStatus::healthy(),
        }
    }
}

struct DrainPool {
    pool: Arc<ConnectionPool>,
}

impl Task for DrainPool {
    fn name(&self) -> &str {
        "drain-pool"
    }

    fn execute(&self, _parameters: &TaskParameters) -> Result<String, TaskError> {
        let drained = self.pool.open.swap(0, Ordering::SeqCst);
        Ok(format!("drained {drained} connections"))
    }
}

struct JsonProvider;
struct GreetingResource;

fn application_context(
    configuration: &ExampleConfiguration,
) -> Result<ComponentContext, Box<dyn Error>> {
    let pool = Arc::new(ConnectionPool {
        size: configuration.pool_size,
        open: AtomicUsize::new(0),
    });

    let mut context = ComponentContext::new();
    context.register(
        Component::builder("connectionPool", Arc::clone(&pool))
            .managed()
            .build(),
    )?;
    let health_pool = Arc::clone(&pool);
    context.register_factory("poolHealth", move || {
        Ok(Component::builder("poolHealth", Arc::new(PoolHealth { pool: health_pool }))
            .health_check()
            .build())
    })?;
    context.register(
        Component::builder("drainPool", Arc::new(DrainPool { pool }))
            .task()
            .build(),
    )?;
    context.register(
        Component::builder("jsonProvider", Arc::new(JsonProvider))
            .provider()
            .build(),
    )?;
    context.register(
        Component::builder("greetingResource", Arc::new(GreetingResource))
            .path("/hello/{name}")
            .build(),
    )?;
    Ok(context)
}

fn load_configuration() -> Result<ExampleConfiguration, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(ExampleConfiguration::default()),
    }
}

fn print_summary(summary: &WiringSummary) {
    for (pass, count) in summary.passes() {
        println!("wirebridge pass={pass} registered={count}");
    }
    println!("wirebridge registrations={}", summary.total());
}

fn main() -> Result<(), Box<dyn Error>> {
    let configuration = load_configuration()?;
    if let Some(log_dir) = &configuration.log_dir {
        let run_id = init_logging(&LoggingOptions::new("info", log_dir))?;
        info!(
            "event=cli_start module=cli run_id={} name={}",
            run_id, configuration.name
        );
    }

    let server = ServerInfo {
        host: configuration.host.clone(),
        port: configuration.port,
    };
    let mut environment = Environment::new(configuration.name.clone());
    let mut bridge = Bridge::with_flags(application_context(&configuration)?, true, true)?;
    let summary = bridge.run(Arc::new(configuration), &mut environment)?;
    print_summary(&summary);

    environment.start(&server)?;
    let health = environment.health_check_registry().run_health_checks();
    println!("wirebridge health={}", serde_json::to_string(&health)?);
    println!(
        "wirebridge routes={}",
        environment.handler_environment().routes().join(",")
    );
    let output = environment
        .admin_environment()
        .execute("drain-pool", &TaskParameters::new())?;
    println!("wirebridge task=drain-pool output={output}");
    environment.stop()?;

    println!("wirebridge version={}", wirebridge_core::core_version());
    Ok(())
}
