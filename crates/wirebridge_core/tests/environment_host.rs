use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wirebridge_core::{
    Bridge, BridgeError, BridgeOptions, Component, ComponentContext, Environment,
    EnvironmentHandle, HealthCheck, HealthStatus, HostError, LifeCycle, LifecycleError, Managed,
    ServerInfo, ServerLifecycleListener, Task, TaskError, TaskParameters,
};

type Journal = Arc<Mutex<Vec<String>>>;

struct Service {
    name: &'static str,
    journal: Journal,
}

impl Managed for Service {
    fn start(&self) -> Result<(), LifecycleError> {
        self.journal
            .lock()
            .expect("journal lock")
            .push(format!("start:{}", self.name));
        Ok(())
    }

    fn stop(&self) -> Result<(), LifecycleError> {
        self.journal
            .lock()
            .expect("journal lock")
            .push(format!("stop:{}", self.name));
        Ok(())
    }
}

struct StartCounter {
    started: AtomicUsize,
}

impl ServerLifecycleListener for StartCounter {
    fn server_started(&self, server: &ServerInfo) {
        assert_eq!(server.port, 8080);
        self.started.fetch_add(1, Ordering::SeqCst);
    }
}

struct DiskSpace {
    free_percent: u8,
}

impl HealthCheck for DiskSpace {
    fn check(&self) -> HealthStatus {
        if self.free_percent < 10 {
            HealthStatus::unhealthy(format!("{}% free", self.free_percent))
        } else {
            HealthStatus::healthy()
        }
    }
}

struct GarbageCollect;

impl Task for GarbageCollect {
    fn name(&self) -> &str {
        "gc"
    }

    fn execute(&self, parameters: &TaskParameters) -> Result<String, TaskError> {
        match parameters.get("runs").and_then(|values| values.first()) {
            Some(runs) => Ok(format!("collected {runs} times")),
            None => Ok("collected once".to_string()),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ExampleConfiguration {
    name: String,
}

fn server() -> ServerInfo {
    ServerInfo {
        host: "0.0.0.0".to_string(),
        port: 8080,
    }
}

fn populated(journal: &Journal, listener: &Arc<StartCounter>) -> ComponentContext {
    let mut context = ComponentContext::new();
    for name in ["database", "queue"] {
        context
            .register(
                Component::builder(
                    name,
                    Arc::new(Service {
                        name,
                        journal: Arc::clone(journal),
                    }),
                )
                .managed()
                .build(),
            )
            .expect("register service");
    }
    context
        .register(
            Component::builder("startCounter", Arc::clone(listener))
                .server_lifecycle_listener()
                .build(),
        )
        .expect("register listener");
    context
        .register(
            Component::builder("disk", Arc::new(DiskSpace { free_percent: 5 }))
                .health_check()
                .build(),
        )
        .expect("register health check");
    context
        .register(
            Component::builder("gcTask", Arc::new(GarbageCollect))
                .task()
                .build(),
        )
        .expect("register task");
    context
        .register(
            Component::builder("usersResource", Arc::new(()))
                .path("/users")
                .build(),
        )
        .expect("register resource");
    context
        .register(
            Component::builder("jsonProvider", Arc::new(()))
                .provider()
                .build(),
        )
        .expect("register provider");
    context
}

#[test]
fn wired_environment_runs_full_lifecycle() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(StartCounter {
        started: AtomicUsize::new(0),
    });
    let options: BridgeOptions = serde_json::from_str(
        r#"{"register_configuration":true,"register_environment":true}"#,
    )
    .expect("bridge options");
    let mut bridge = Bridge::with_options(populated(&journal, &listener), &options)
        .expect("inactive registry");
    let mut environment = Environment::new("example");

    let summary = bridge
        .run(
            Arc::new(ExampleConfiguration {
                name: "example".to_string(),
            }),
            &mut environment,
        )
        .expect("wiring should succeed");
    assert_eq!(summary.total(), 7);

    let handle = bridge
        .registry()
        .get_as::<EnvironmentHandle>("dwEnv")
        .expect("environment handle stored");
    assert_eq!(handle.id(), environment.handle().id());
    assert_eq!(
        bridge
            .registry()
            .get_as::<ExampleConfiguration>("dw")
            .expect("configuration stored")
            .name,
        "example"
    );

    let lifecycle = environment.lifecycle_environment();
    let managed: Vec<&str> = lifecycle
        .managed_objects()
        .iter()
        .map(|object| object.component())
        .collect();
    assert_eq!(managed, vec!["database", "queue"]);
    assert_eq!(lifecycle.server_lifecycle_listeners().len(), 1);
    assert_eq!(environment.admin_environment().task_names(), vec!["gc"]);
    assert_eq!(environment.handler_environment().routes(), vec!["/users"]);
    assert_eq!(environment.handler_environment().providers().len(), 1);

    environment.start(&server()).expect("environment start");
    assert!(handle.is_running());
    assert_eq!(listener.started.load(Ordering::SeqCst), 1);

    let health = environment.health_check_registry().run_health_checks();
    assert_eq!(health.get("disk"), Some(&HealthStatus::unhealthy("5% free")));

    let mut parameters = TaskParameters::new();
    parameters.insert("runs".to_string(), vec!["3".to_string()]);
    assert_eq!(
        environment
            .admin_environment()
            .execute("gc", &parameters)
            .expect("task output"),
        "collected 3 times"
    );

    environment.stop().expect("environment stop");
    assert!(!handle.is_running());
    assert_eq!(
        *journal.lock().expect("journal lock"),
        vec!["start:database", "start:queue", "stop:queue", "stop:database"]
    );
}

#[test]
fn wiring_after_start_fails_fast() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(StartCounter {
        started: AtomicUsize::new(0),
    });
    let mut bridge = Bridge::new(populated(&journal, &listener));
    let mut environment = Environment::new("example");
    let configuration = Arc::new(ExampleConfiguration {
        name: "example".to_string(),
    });

    bridge
        .run(Arc::clone(&configuration), &mut environment)
        .expect("first wiring");
    environment.start(&server()).expect("environment start");

    let err = bridge
        .run(configuration, &mut environment)
        .expect_err("managing after start must fail");
    assert_eq!(
        err,
        BridgeError::Host(HostError::LifecycleStarted("database".to_string()))
    );
    assert_eq!(environment.lifecycle_environment().managed_objects().len(), 2);
}

#[test]
fn duplicate_health_registrations_across_runs_keep_the_first() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(StartCounter {
        started: AtomicUsize::new(0),
    });
    let mut bridge = Bridge::new(populated(&journal, &listener));
    let mut environment = Environment::new("example");
    let configuration = Arc::new(ExampleConfiguration {
        name: "example".to_string(),
    });

    bridge
        .run(Arc::clone(&configuration), &mut environment)
        .expect("first wiring");
    bridge
        .run(configuration, &mut environment)
        .expect("second wiring");

    let registry = environment.health_check_registry();
    assert_eq!(registry.register_calls(), 2);
    assert_eq!(registry.names(), vec!["disk"]);
    assert_eq!(environment.lifecycle_environment().managed_objects().len(), 4);
    assert_eq!(environment.handler_environment().resources().len(), 2);
}
