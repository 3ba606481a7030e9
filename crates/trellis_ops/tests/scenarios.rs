//! End-to-end scenarios exercising resolution, disciplines and handles
//! together through real plugins.

mod test_utils;

use std::sync::Arc;

use futures::FutureExt;
use test_utils::{ScriptedPlugin, show};
use trellis_kernel::manager::PluginManager;
use trellis_kernel::plugin::Plugin;
use trellis_kernel::step::OperationStep;
use trellis_ops::error::InvokeError;
use trellis_ops::handle::{AsyncWrapperOperation, CallAllOperation, WrapperOperation};

// ─────────────────────────────────────────────────────────────────────────────
// Ordering with forward and reverse dependencies
// ─────────────────────────────────────────────────────────────────────────────

static INIT: CallAllOperation<()> = CallAllOperation::new("init");

#[test]
fn forward_and_reverse_dependencies_order_the_sequence() {
    let p1 = ScriptedPlugin::builder("P1")
        .step("init", INIT.implementation("init@P1", |&()| Ok(())))
        .build();
    let p2 = ScriptedPlugin::builder("P2")
        .step(
            "init",
            INIT.implementation("init@P2", |&()| Ok(())).after(["init@P1"]),
        )
        .build();
    let p3 = ScriptedPlugin::builder("P3")
        .step(
            "init",
            INIT.implementation("init@P3", |&()| Ok(())).before(["init@P1"]),
        )
        .build();

    let manager = PluginManager::new([p1, p2, p3]);
    let sequence = manager.get_operation_sequence("init").unwrap();
    let names: Vec<&str> = sequence.iter().map(OperationStep::name).collect();
    assert_eq!(names, ["init@P3", "init@P1", "init@P2"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle detection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chicken_and_egg_cycle_is_reported_with_both_steps() {
    let chicken = ScriptedPlugin::builder("Chicken")
        .step(
            "create",
            OperationStep::builder("chicken", Arc::new(())).after(["egg"]),
        )
        .build();
    let egg = ScriptedPlugin::builder("Egg")
        .step(
            "create",
            OperationStep::builder("egg", Arc::new(())).after(["chicken"]),
        )
        .build();

    let manager = PluginManager::new([chicken, egg]);
    let err = manager
        .get_operation_sequence("create")
        .expect_err("cycle expected");

    let text = err.to_string();
    assert!(text.contains("Chicken"), "{text}");
    assert!(text.contains("Egg"), "{text}");
    assert!(text.contains("chicken"), "{text}");
    assert!(text.contains("egg"), "{text}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Duplicate step names
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn duplicate_step_name_keeps_the_first_plugin() {
    let first = ScriptedPlugin::builder("First")
        .step("init", OperationStep::builder("init", Arc::new(())))
        .build();
    let second = ScriptedPlugin::builder("Second")
        .step("init", OperationStep::builder("init", Arc::new(())))
        .build();

    let manager = PluginManager::new([first, second]);
    let sequence = manager.get_operation_sequence("init").unwrap();

    assert_eq!(sequence.len(), 1);
    assert_eq!(sequence.steps()[0].plugin().name(), "First");
}

// ─────────────────────────────────────────────────────────────────────────────
// Async wrapper chain
// ─────────────────────────────────────────────────────────────────────────────

static WRAP_OP: AsyncWrapperOperation<(), String> = AsyncWrapperOperation::new("op");

#[tokio::test]
async fn async_wrapper_chain_composes_inward_and_outward() {
    let p1 = ScriptedPlugin::builder("P1")
        .step(
            "op",
            WRAP_OP.implementation("foo-1", |next, prev, args| {
                async move {
                    let prev = format!("{}+foo1", show(prev));
                    let prev = next.invoke(Some(prev), args).await?;
                    Ok(Some(format!("{}+foo1p", show(prev))))
                }
                .boxed()
            }),
        )
        .build();
    let p2 = ScriptedPlugin::builder("P2")
        .step(
            "op",
            WRAP_OP
                .implementation("foo-2", |next, prev, args| {
                    async move {
                        let prev = format!("{}+foo2", show(prev));
                        let prev = next.invoke(Some(prev), args).await?;
                        Ok(Some(format!("{}+foo2p", show(prev))))
                    }
                    .boxed()
                })
                .after(["foo-1"]),
        )
        .build();

    // Registration order deliberately reversed; dependencies decide.
    let manager = PluginManager::new([p2, p1]);
    let result = manager
        .clone()
        .as_current(async { WRAP_OP.invoke(()).await })
        .await
        .expect("chain runs");

    assert_eq!(result.as_deref(), Some("None+foo1+foo2+foo2p+foo1p"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory-wrapper selection
// ─────────────────────────────────────────────────────────────────────────────

static MAKE_OP: AsyncWrapperOperation<String, String> = AsyncWrapperOperation::new("make");

fn factory_plugins() -> Vec<Arc<dyn Plugin>> {
    let p1 = ScriptedPlugin::builder("P1")
        .step(
            "make",
            MAKE_OP.factory_implementation("fac1", |kind: String| {
                async move {
                    if kind == "type1" {
                        Ok(Some("f1".to_owned()))
                    } else {
                        Ok(None)
                    }
                }
                .boxed()
            }),
        )
        .build();
    let p2 = ScriptedPlugin::builder("P2")
        .step(
            "make",
            MAKE_OP
                .factory_implementation("fac2", |kind: String| {
                    async move {
                        if kind == "type2" {
                            Err("fac2 called".into())
                        } else {
                            Ok(None)
                        }
                    }
                    .boxed()
                })
                .after(["fac1"]),
        )
        .build();
    let p3 = ScriptedPlugin::builder("P3")
        .step(
            "make",
            MAKE_OP.implementation("decorate3", |next, prev, args| {
                async move {
                    let value = next.invoke(prev, args).await?;
                    Ok(Some(format!("{}+decorator", show(value))))
                }
                .boxed()
            }),
        )
        .build();
    vec![p1, p2, p3]
}

#[tokio::test]
async fn first_matching_factory_wins_and_decorators_still_run() {
    let manager = PluginManager::new(factory_plugins());
    let result = manager
        .clone()
        .as_current(async { MAKE_OP.invoke("type1".to_owned()).await })
        .await
        .expect("chain runs");
    assert_eq!(result.as_deref(), Some("f1+decorator"));
}

#[tokio::test]
async fn no_matching_factory_still_decorates_the_absent_value() {
    let manager = PluginManager::new(factory_plugins());
    let result = manager
        .clone()
        .as_current(async { MAKE_OP.invoke("X3".to_owned()).await })
        .await
        .expect("chain runs");
    assert_eq!(result.as_deref(), Some("None+decorator"));
}

#[tokio::test]
async fn factory_errors_propagate_to_the_caller() {
    let manager = PluginManager::new(factory_plugins());
    let err = manager
        .clone()
        .as_current(async { MAKE_OP.invoke("type2".to_owned()).await })
        .await
        .expect_err("second factory raises");
    assert_eq!(err.to_string(), "fac2 called");
}

// ─────────────────────────────────────────────────────────────────────────────
// Result checks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failed_result_check_names_operation_and_message() {
    static CONCAT: WrapperOperation<(String, String), String> = WrapperOperation::new("concat");
    let checked = CONCAT.clone().returning_value();

    let empty_handed = ScriptedPlugin::builder("P1")
        .step(
            "concat",
            CONCAT.factory_implementation("f1", |(_a, _b): &(String, String)| Ok(None)),
        )
        .build();
    let producing = ScriptedPlugin::builder("P2")
        .step(
            "concat",
            CONCAT.factory_implementation("f2", |(a, b): &(String, String)| {
                Ok(Some(format!("{a}{b}")))
            }),
        )
        .build();

    let manager = PluginManager::new([empty_handed.clone(), producing]);
    let joined = manager
        .as_current_sync(|| checked.invoke(&("a".to_owned(), "b".to_owned())))
        .expect("second factory produces");
    assert_eq!(joined.as_deref(), Some("ab"));

    // With only the empty-handed provider, the check trips.
    let manager = PluginManager::new([empty_handed]);
    let err = manager
        .as_current_sync(|| checked.invoke(&("a".to_owned(), "b".to_owned())))
        .expect_err("check fails");
    assert!(matches!(
        err,
        InvokeError::ResultCheckFailed { ref operation, .. } if operation == "concat"
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache drop scoped to a plugin
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cache_dropped_for_a_plugin_that_enumerates_its_operations() {
    let q = ScriptedPlugin::builder("Q")
        .step("r", OperationStep::builder("q.step", Arc::new(())))
        .listable()
        .build();
    let manager = PluginManager::new([q.clone()]);

    let first = manager.operation_cache("r", 1, || 42_u64);
    assert_eq!(*first, 42);
    let cached = manager.operation_cache::<u64, _, _>("r", 1, || unreachable!("entry is live"));
    assert_eq!(*cached, 42);

    manager.drop_operation_cache_for_plugin(q.as_ref());

    let fresh = manager.operation_cache("r", 1, || 43_u64);
    assert_eq!(*fresh, 43);
}

#[test]
fn cache_survives_a_drop_scoped_to_an_unlistable_plugin() {
    let anon = ScriptedPlugin::builder("Anon")
        .step("r", OperationStep::builder("anon.step", Arc::new(())))
        .build();
    let manager = PluginManager::new([anon.clone()]);

    manager.operation_cache("r", 1, || 42_u64);
    manager.drop_operation_cache_for_plugin(anon.as_ref());

    let kept = manager.operation_cache("r", 1, || 99_u64);
    assert_eq!(*kept, 42);
}
