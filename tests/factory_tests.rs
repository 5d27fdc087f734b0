//! Integration tests for the control factory
//!
//! Drives the full stack (built-in redirectors, built-in variants, mock DOM)
//! and checks the caching and construction guarantees of the factory.

use async_trait::async_trait;
use futures::future::join_all;
use ki_page_controls::capabilities::*;
use ki_page_controls::controls::builtin_registrations;
use ki_page_controls::controls::dom_control::DomTemplate;
use ki_page_controls::controls::testing::NullControl;
use ki_page_controls::info::{AppSettings, ChannelSetting};
use ki_page_controls::{
    CandidateSource, CapabilityId, ConstructionError, ControlFactory, ControlHandle, DomAccessor,
    DomControl, DomElement, EnvironmentInfo, MockDomAccessor, PageContext, RedirectionInfo,
    RedirectorRegistry, ResolveError, ServiceCollection, SessionSnapshot, StaticSource,
    StrategyCatalog, StrategyResolver, VariantRegistration, Version,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tokio::sync::Notify;

const PLATFORM: Version = Version::new(9, 2, 24000, 0);
const FORM: CapabilityId = CapabilityId::new("Form");
const X: CapabilityId = CapabilityId::new("X");

fn new_look_monthly() -> RedirectionInfo {
    RedirectionInfo::new(PLATFORM).with_app(AppSettings {
        new_look_always_on: true,
        app_channel: ChannelSetting::Monthly,
        ..Default::default()
    })
}

fn form_registration() -> VariantRegistration {
    let template = DomTemplate::new("Form", r#"[data-id="form-{name}"]"#);
    let registration = VariantRegistration::new(FORM, "Form", Version::ZERO, move |args| {
        Ok(Arc::new(template.build(&args)?))
    });
    template
        .params()
        .into_iter()
        .fold(registration, |registration, param| registration.param(param))
}

fn environment() -> Arc<SessionSnapshot<EnvironmentInfo>> {
    Arc::new(SessionSnapshot::with_value(
        "environment info",
        EnvironmentInfo::new(PLATFORM),
    ))
}

/// Builtin catalog plus a `Form` container, a mock DOM and known snapshots.
fn builtin_factory(dom: &Arc<MockDomAccessor>) -> ControlFactory {
    let registrations = builtin_registrations()
        .into_iter()
        .chain(std::iter::once(form_registration()));
    let resolver = Arc::new(StrategyResolver::from_catalog(
        StrategyCatalog::from_registrations(registrations),
    ));
    let dom: Arc<dyn DomAccessor> = Arc::clone(dom) as Arc<dyn DomAccessor>;

    ControlFactory::new(resolver)
        .with_redirectors(RedirectorRegistry::builtin())
        .with_environment(environment())
        .with_redirection(Arc::new(SessionSnapshot::with_value(
            "redirection info",
            new_look_monthly(),
        )))
        .with_services(Arc::new(ServiceCollection::new().with(dom)))
}

fn counting_factory(built: &Arc<AtomicUsize>, delay: Duration) -> ControlFactory {
    let counter = Arc::clone(built);
    let registration = VariantRegistration::new(X, "Slow", Version::ZERO, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(delay);
        Ok(Arc::new(NullControl::new("Slow")))
    });
    let resolver = Arc::new(StrategyResolver::from_catalog(
        StrategyCatalog::from_registrations(vec![registration]),
    ));
    ControlFactory::new(resolver).with_environment(environment())
}

// ============================================================================
// End-to-end resolution
// ============================================================================

#[tokio::test]
async fn test_field_resolves_to_unified_input() {
    let dom = Arc::new(MockDomAccessor::new());
    dom.add_element(
        DomElement::new(r#"[data-id="revenue.fieldControl-unified-input"]"#, "input")
            .with_attribute("value", "10"),
    );
    let factory = builtin_factory(&dom);

    let field = factory
        .create_cached_instance(FIELD, Some("revenue"), None)
        .unwrap();

    assert_eq!(field.resolved_capability(), FIELD_SECTION_ITEM_UNIFIED);
    assert_eq!(field.variant(), "FieldSectionItemUnifiedInput");
    assert_eq!(field.name(), Some("revenue"));
    assert!(field.is_present().await.unwrap());
    assert_eq!(field.get_value().await.unwrap().as_deref(), Some("10"));

    field.set_value("25").await.unwrap();
    let scripts = dom.evaluated_scripts();
    assert_eq!(scripts.len(), 1);
    assert!(scripts[0].contains(r#"el.value = "25";"#));
}

#[tokio::test]
async fn test_construction_does_not_touch_the_dom() {
    let dom = Arc::new(MockDomAccessor::new());
    let factory = builtin_factory(&dom);

    let field = factory.create_instance(FIELD, Some("revenue"), None).unwrap();
    assert!(dom.evaluated_scripts().is_empty());
    assert!(!field.is_present().await.unwrap());
}

#[test]
fn test_status_field_by_name() {
    let dom = Arc::new(MockDomAccessor::new());
    let factory = builtin_factory(&dom);

    let status = factory
        .create_instance(FIELD, Some("incident.statuscode"), None)
        .unwrap();
    assert_eq!(status.resolved_capability(), STATUS_FIELD);
    assert_eq!(status.variant(), "StatusField");
}

#[test]
fn test_child_selector_is_scoped_by_parent() {
    let dom = Arc::new(MockDomAccessor::new());
    let factory = builtin_factory(&dom);

    let form = factory
        .create_cached_instance(FORM, Some("account"), None)
        .unwrap();
    let field = factory
        .create_cached_instance(FIELD, Some("name"), Some(&form))
        .unwrap();

    let control = field.downcast_ref::<DomControl>().unwrap();
    assert_eq!(
        control.selector(),
        r#"[data-id="form-account"] [data-id="name.fieldControl-unified-input"]"#
    );
    assert_eq!(field.identity().to_string(), "Form[account]/Field[name]");
}

#[test]
fn test_missing_dom_service_is_construction_failure() {
    let resolver = Arc::new(StrategyResolver::from_catalog(
        StrategyCatalog::from_registrations(builtin_registrations()),
    ));
    let factory = ControlFactory::new(resolver).with_environment(environment());

    let err = factory.create_instance(QUICK_FIND, None, None).unwrap_err();
    match err {
        ResolveError::ConstructionFailure {
            capability,
            variant,
            source: ConstructionError::MissingDependency(dependency),
        } => {
            assert_eq!(capability, QUICK_FIND);
            assert_eq!(variant, "QuickFind");
            assert!(dependency.contains("DomAccessor"));
        }
        other => panic!("expected ConstructionFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_navigation_requires_an_open_page() {
    let dom = Arc::new(MockDomAccessor::new());
    dom.add_element(DomElement::new(r#"[data-id="navbar-container"]"#, "nav"));

    let err = builtin_factory(&dom)
        .create_instance(NAVIGATION, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ConstructionFailure {
            source: ConstructionError::MissingArgument("page"),
            ..
        }
    ));

    let page = Arc::new(PageContext::new("https://org.example.com/main.aspx", "Dashboard"));
    let factory = builtin_factory(&dom).with_page(Arc::clone(&page));
    let navigation = factory.create_instance(NAVIGATION, None, None).unwrap();
    assert_eq!(navigation.variant(), "ModernNavigation");
    navigation.click().await.unwrap();

    page.set_closed();
    assert!(navigation.click().await.is_err());
    assert!(!navigation.is_present().await.unwrap());
}

#[test]
fn test_unknown_redirection_info_is_not_ready_only_when_needed() {
    let dom = Arc::new(MockDomAccessor::new());
    let resolver = Arc::new(StrategyResolver::from_catalog(
        StrategyCatalog::from_registrations(builtin_registrations()),
    ));
    let dom: Arc<dyn DomAccessor> = dom;
    let factory = ControlFactory::new(resolver)
        .with_redirectors(RedirectorRegistry::builtin())
        .with_environment(environment())
        .with_services(Arc::new(ServiceCollection::new().with(dom)));

    assert!(factory.create_instance(QUICK_FIND, None, None).is_ok());

    let err = factory.create_instance(FIELD, Some("name"), None).unwrap_err();
    assert!(matches!(
        err,
        ResolveError::NotReady {
            component: "redirection info"
        }
    ));
    assert!(err.is_retryable());
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_cached_identity_law() {
    let dom = Arc::new(MockDomAccessor::new());
    let factory = builtin_factory(&dom);

    let a = factory.create_cached_instance(FIELD, Some("name"), None).unwrap();
    let b = factory.create_cached_instance(FIELD, Some("name"), None).unwrap();
    let other_name = factory.create_cached_instance(FIELD, Some("email"), None).unwrap();
    let other_capability = factory
        .create_cached_instance(FIELD_SECTION_ITEM_UNIFIED, Some("name"), None)
        .unwrap();

    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&other_name));
    // Identity keys on the requested capability, not the redirect target.
    assert!(!a.ptr_eq(&other_capability));
    assert_eq!(a.variant(), other_capability.variant());
    assert_eq!(factory.cached_count(), 3);
    assert!(factory.cached(a.identity()).is_some());
}

#[test]
fn test_non_cached_path_is_independent() {
    let built = Arc::new(AtomicUsize::new(0));
    let factory = counting_factory(&built, Duration::ZERO);

    let first = factory.create_instance(X, Some("a"), None).unwrap();
    let second = factory.create_instance(X, Some("a"), None).unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(factory.cached_count(), 0);

    let cached = factory.create_cached_instance(X, Some("a"), None).unwrap();
    let fresh = factory.create_instance(X, Some("a"), None).unwrap();
    assert!(!cached.ptr_eq(&fresh));
    assert_eq!(factory.cached_count(), 1);
    assert_eq!(built.load(Ordering::SeqCst), 4);
}

#[test]
fn test_concurrent_cached_requests_construct_once() {
    const WORKERS: usize = 8;
    let built = Arc::new(AtomicUsize::new(0));
    let factory = counting_factory(&built, Duration::from_millis(20));
    let barrier = Barrier::new(WORKERS);

    let handles: Vec<ControlHandle> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    factory
                        .create_cached_instance(X, Some("shared"), None)
                        .unwrap()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect()
    });

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|handle| handle.ptr_eq(&handles[0])));
    assert_eq!(factory.cached_count(), 1);
}

struct GatedSource {
    gate: Arc<Notify>,
    inner: StaticSource,
}

#[async_trait]
impl CandidateSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    async fn exported_variants(&self) -> anyhow::Result<Vec<VariantRegistration>> {
        self.gate.notified().await;
        self.inner.exported_variants().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiting_callers_share_one_instance() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let gate = Arc::new(Notify::new());
    let source = GatedSource {
        gate: Arc::clone(&gate),
        inner: StaticSource::new("static").register(VariantRegistration::new(
            X,
            "Counted",
            Version::ZERO,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(NullControl::new("Counted")))
            },
        )),
    };
    let resolver = StrategyResolver::spawn_load(vec![Arc::new(source) as Arc<dyn CandidateSource>]);
    let factory = Arc::new(ControlFactory::new(resolver).with_environment(environment()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let factory = Arc::clone(&factory);
            tokio::spawn(async move {
                factory
                    .create_cached_instance_when_ready(X, Some("shared"), None)
                    .await
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(factory.cached_count(), 0);
    gate.notify_one();

    let handles: Vec<ControlHandle> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|handle| handle.ptr_eq(&handles[0])));
}

#[tokio::test]
async fn test_create_instance_when_ready_on_ready_resolver() {
    let built = Arc::new(AtomicUsize::new(0));
    let factory = counting_factory(&built, Duration::ZERO);

    let handle = factory
        .create_instance_when_ready(X, None, None)
        .await
        .unwrap();
    assert_eq!(handle.variant(), "Slow");
    assert_eq!(factory.cached_count(), 0);
}
