// crates/crosscut-meta/tests/hierarchy.rs
// ============================================================================
// Module: Hierarchy Tests
// Description: Tests for subtype queries, method lookup, and override resolution.
// ============================================================================
//! ## Overview
//! Validates interface closures, inherited method lookup, and bridge resolution.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use std::sync::Arc;

use crosscut_meta::ClassBuilder;
use crosscut_meta::ClassRef;
use crosscut_meta::MethodSpec;
use crosscut_meta::OBJECT_TYPE;
use crosscut_meta::TypeLoader;
use crosscut_meta::bridged_method;
use crosscut_meta::most_specific_method;
use proptest::prelude::*;
use support::TestResult;
use support::ensure;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Repository interface, base class, and a concrete subclass.
struct Fixture {
    /// `repo.Repository` interface declaring `find(i64)`.
    repository: ClassRef,
    /// `repo.BaseRepository` implementing the interface.
    base: ClassRef,
    /// `repo.UserRepository` overriding `find` and adding a bridge.
    users: ClassRef,
}

fn fixture(loader_name: &str) -> TestResult<Fixture> {
    let loader = TypeLoader::isolated(loader_name);
    let repository = ClassBuilder::interface("repo.Repository")
        .method(MethodSpec::new("find").params(["i64"]).returns(OBJECT_TYPE))
        .define(&loader)?;
    let base = ClassBuilder::class("repo.BaseRepository")
        .implements(&repository)
        .method(MethodSpec::new("find").params(["i64"]).returns(OBJECT_TYPE))
        .method(MethodSpec::new("count").returns("i64"))
        .define(&loader)?;
    let users = ClassBuilder::class("repo.UserRepository")
        .extends(&base)
        .method(MethodSpec::new("find").params(["i64"]).returns("String").annotate("Cached"))
        .method(MethodSpec::new("save").params(["String"]))
        .method(MethodSpec::new("save").params([OBJECT_TYPE]).bridge_to(["String"]))
        .define(&loader)?;
    Ok(Fixture {
        repository,
        base,
        users,
    })
}

// ============================================================================
// SECTION: Hierarchy Queries
// ============================================================================

#[test]
fn subclass_inherits_interfaces_and_methods() -> TestResult {
    let fixture = fixture("hierarchy-inherit")?;
    ensure(fixture.users.is_assignable_to(&fixture.repository), "Expected inherited interface")?;
    ensure(fixture.users.is_subtype_of_name(OBJECT_TYPE), "Expected Object supertype")?;
    ensure(!fixture.base.is_assignable_to(&fixture.users), "Expected no downward assignability")?;

    let names: Vec<String> = fixture.users.all_methods().iter().map(|m| m.signature()).collect();
    ensure(names.iter().filter(|name| name.as_str() == "find(i64)").count() == 1, "Expected de-duplicated find")?;
    ensure(names.contains(&"count()".to_string()), "Expected inherited count")?;
    let find = fixture.users.find_method("find", &["i64".to_string()]).unwrap();
    ensure(find.declaring() == "repo.UserRepository", "Expected most specific declaration")?;
    Ok(())
}

#[test]
fn interface_method_resolves_to_override() -> TestResult {
    let fixture = fixture("hierarchy-override")?;
    let declared = fixture.repository.declared_method("find", &["i64".to_string()]).unwrap();
    let resolved = most_specific_method(&declared, &fixture.users);
    ensure(resolved.declaring() == "repo.UserRepository", "Expected override on subclass")?;
    ensure(resolved.has_annotation("Cached"), "Expected annotations of the override")?;
    Ok(())
}

#[test]
fn bridge_resolves_to_bridged_method() -> TestResult {
    let fixture = fixture("hierarchy-bridge")?;
    let bridge = fixture.users.declared_method("save", &[OBJECT_TYPE.to_string()]).unwrap();
    ensure(bridge.is_bridge(), "Expected bridge flag")?;
    let bridged = bridged_method(&bridge, &fixture.users);
    ensure(bridged.params() == ["String".to_string()], "Expected bridged signature")?;
    ensure(!bridged.is_bridge(), "Expected non-bridge result")?;
    Ok(())
}

#[test]
fn method_keys_distinguish_declaring_types() -> TestResult {
    let fixture = fixture("hierarchy-keys")?;
    let on_base = fixture.base.declared_method("find", &["i64".to_string()]).unwrap();
    let on_users = fixture.users.declared_method("find", &["i64".to_string()]).unwrap();
    ensure(on_base.key() != on_users.key(), "Expected distinct keys")?;
    ensure(on_base.same_signature(&on_users), "Expected equal signatures")?;
    ensure(on_users.key().to_string() == "repo.UserRepository.find(i64)", "Expected key display")?;
    Ok(())
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn every_class_in_a_chain_is_a_supertype_of_the_leaf(depth in 1usize .. 12) {
        let loader = TypeLoader::isolated(format!("chain-{depth}"));
        let mut chain: Vec<ClassRef> = Vec::new();
        for level in 0 .. depth {
            let mut builder = ClassBuilder::class(format!("chain.Level{level}"));
            if let Some(parent) = chain.last() {
                builder = builder.extends(parent);
            }
            chain.push(builder.define(&loader).unwrap());
        }
        let leaf = Arc::clone(chain.last().unwrap());
        for class in &chain {
            prop_assert!(leaf.is_assignable_to(class));
        }
        prop_assert_eq!(leaf.superclasses().count(), depth);
    }
}
