//! Integration tests for the container façade: factories, injection,
//! subcomponents, modules and the current-container key.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Calls;
use keyed_di::{
    Container, ContainerOptions, DependencyExt, Factory, Key, Module, Scope, CONTAINER,
};

#[derive(Debug, Clone, PartialEq)]
struct Connection {
    url: String,
    pool: usize,
}

type ConnectionFactory = Factory<(String, usize), Connection>;

fn connection_factory() -> ConnectionFactory {
    Factory::new(|(url, pool): (String, usize)| Connection { url, pool })
}

#[test]
fn test_build_invokes_factory() {
    let factory = Key::<ConnectionFactory>::named("connection_factory");
    let container = Container::new();
    container.provide_instance(&factory, connection_factory());

    let connection = container.build(&factory, ("postgres://db".to_string(), 4)).unwrap();
    assert_eq!(
        connection,
        Connection {
            url: "postgres://db".to_string(),
            pool: 4
        }
    );
}

#[test]
fn test_build_key_binds_leading_arguments() {
    let factory = Key::<ConnectionFactory>::named("connection_factory");
    let primary = factory.build(("postgres://primary".to_string(),));

    let container = Container::new();
    container.provide_instance(&factory, connection_factory());

    let small = container.build(primary.clone(), (1,)).unwrap();
    let large = container.build(primary, (16,)).unwrap();
    assert_eq!(small.url, "postgres://primary");
    assert_eq!((small.pool, large.pool), (1, 16));
}

#[test]
fn test_factory_closing_over_dependencies() {
    let url = Key::<String>::named("url");
    let factory = Key::<Factory<(usize,), Connection>>::named("pooled");

    let container = Container::new();
    container
        .provide_instance(&url, "postgres://configured".to_string())
        .provide(&factory, url.clone(), |url| {
            Factory::new(move |(pool,): (usize,)| Connection {
                url: url.clone(),
                pool,
            })
        });

    let connection = container.build(&factory, (2,)).unwrap();
    assert_eq!(connection.url, "postgres://configured");
}

#[tokio::test]
async fn test_build_async_with_async_factory() {
    let factory = Key::<ConnectionFactory>::named("connection_factory");
    let container = Container::new();
    container.provide_async(&factory, (), |()| async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        connection_factory()
    });

    assert!(container.build(&factory, ("x".to_string(), 1)).is_err());

    let connection = container
        .build_async(&factory, ("postgres://async".to_string(), 8))
        .await
        .unwrap();
    assert_eq!(connection.pool, 8);
}

#[tokio::test]
async fn test_inject_and_inject_async() {
    let port = Key::<u16>::named("port");
    let host = Key::<String>::named("host");

    let container = Container::new();
    container
        .provide_instance(&port, 8080)
        .provide_async(&host, (), |()| async { "localhost".to_string() });

    let doubled = container.inject(&port, |port| port * 2).unwrap();
    assert_eq!(doubled, 16160);

    let address = container
        .inject_async((&host, &port), |(host, port)| async move { format!("{}:{}", host, port) })
        .await
        .unwrap();
    assert_eq!(address, "localhost:8080");
}

#[test]
fn test_current_container_is_the_resolving_container() {
    let owner = Key::<String>::builder("owner").scope(Scope::SINGLETON).build();
    let requester = Key::<String>::named("requester");

    let root = Container::with_options(ContainerOptions::new().name("root"));
    root.provide(&owner, CONTAINER, |c| c.to_string())
        .provide(&requester, CONTAINER, |c| c.to_string());

    let child = root.create_child_with(ContainerOptions::new().name("child"));
    assert_eq!(child.request(&owner).unwrap(), "root");
    assert_eq!(child.request(&requester).unwrap(), "child");
}

#[test]
fn test_subcomponents_get_their_own_scoped_instances() {
    let request = Scope::new("request");
    let calls = Calls::new();
    let counter = calls.clone();
    let request_id = Key::<String>::named("request_id");
    let context = Key::<Arc<String>>::builder("context").scope(request.clone()).build();

    let root = Container::new();
    root.provide(&context, request_id.clone(), move |id| {
        counter.hit();
        Arc::new(format!("context for {}", id))
    });

    let scope = request.clone();
    let id_key = request_id.clone();
    let per_request = root.create_subcomponent(move |child: &Container, id: String| {
        child.add_scope(scope.clone());
        child.provide_instance(&id_key, id);
    });

    let first = per_request.create("r-1".to_string());
    let second = per_request.create("r-2".to_string());

    let a = first.request(&context).unwrap();
    let b = first.request(&context).unwrap();
    let c = second.request(&context).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*a, "context for r-1");
    assert_eq!(*c, "context for r-2");
    assert_eq!(calls.count(), 2);
}

struct HttpModule {
    port: Key<u16>,
    base_url: Key<String>,
}

impl Module for HttpModule {
    fn name(&self) -> &'static str {
        "http"
    }

    fn configure(&self, container: &Container) {
        container
            .provide_instance(&self.port, 3000)
            .provide(&self.base_url, self.port.clone(), |port| {
                format!("http://localhost:{}", port)
            });
    }
}

#[test]
fn test_modules_compose_registrations() {
    let port = Key::<u16>::named("port");
    let base_url = Key::<String>::named("base_url");

    let override_port = port.clone();
    let container = Container::builder()
        .name("app")
        .module(HttpModule {
            port: port.clone(),
            base_url: base_url.clone(),
        })
        .module(move |c: &Container| {
            c.provide_instance(&override_port, 8443);
        })
        .build();

    assert_eq!(container.request(&base_url).unwrap(), "http://localhost:8443");
}

#[test]
fn test_check_validates_without_running_initializers() {
    let calls = Calls::new();
    let counter = calls.clone();
    let config = Key::<String>::named("config");
    let service = Key::<String>::builder("service").scope(Scope::SINGLETON).build();
    let missing = Key::<String>::named("missing");

    let container = Container::new();
    container
        .provide_instance(&config, "cfg".to_string())
        .provide(&service, config.clone(), move |config| {
            counter.hit();
            config.to_uppercase()
        });

    container.check((&service, missing.optional())).unwrap();
    assert!(container.check((&service, &missing)).is_err());
    assert_eq!(calls.count(), 0);

    assert_eq!(container.request(&service).unwrap(), "CFG");
    assert_eq!(calls.count(), 1);
}

#[test]
fn test_dispose_releases_instances_holding_the_container() {
    let holder = Key::<Container>::builder("holder").scope(Scope::SINGLETON).build();
    let container = Container::new();
    container.provide(&holder, CONTAINER, |c| c);

    let held = container.request(&holder).unwrap();
    assert!(held.ptr_eq(&container));

    container.dispose();
    assert!(container.request(&holder).unwrap_err().is_key_not_provided());
}
