//! Integration tests for profile repository

use multisite_profile_repository::prelude::*;
use multisite_test_helpers::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_repository(
    mocks: &MockCollaborators,
) -> (ProfileRepository<Arc<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let repo = must(ProfileRepository::new(
        ProfileRepositoryConfig::default(),
        Arc::clone(&store),
        mocks.collaborators(),
    ));
    (repo, store)
}

fn option_data(entries: &[(&str, &str)]) -> BTreeMap<String, OptionInput> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), OptionInput::new(*value)))
        .collect()
}

mod repository_lifecycle {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mocks = MockCollaborators::default();
        let (repo, _store) = create_test_repository(&mocks);

        let id = must(repo.insert("Profile A", "desc"));
        let profile = must_some(must(repo.find(id)), "inserted profile must exist");
        assert_eq!(profile.name, "Profile A");
        assert_eq!(profile.description, "desc");

        must(repo.update_name(id, "Profile B"));
        must(repo.update_description(id, "changed"));
        assert_eq!(
            must(repo.list_all()),
            vec![ProfileSummary {
                profile_id: id,
                profile_name: "Profile B".to_string(),
            }]
        );

        must(repo.delete(id));
        assert_eq!(must(repo.find_name(id, None)), "New Profile");
        assert!(!must(repo.list_all_ids()).contains(&id));
        assert!(!must(repo.exists(id)));
    }

    #[test]
    fn test_free_id_sequence() {
        let mocks = MockCollaborators::default();
        let (repo, _store) = create_test_repository(&mocks);

        assert_eq!(must(repo.insert("one", "")), profile_id(1));
        assert_eq!(must(repo.insert("two", "")), profile_id(2));
        assert_eq!(must(repo.insert("three", "")), profile_id(3));

        must(repo.delete(profile_id(2)));
        assert_eq!(
            must(repo.list_all_ids()),
            vec![profile_id(1), profile_id(3)]
        );

        let allocator = ProfileIdAllocator::new(repo.keys(), repo.store());
        assert_eq!(must(allocator.find_free_id()), profile_id(2));
    }

    #[test]
    fn test_default_profile_not_overwritten() {
        let mocks = MockCollaborators::default();
        let (repo, store) = create_test_repository(&mocks);

        assert_eq!(
            must(repo.insert_default_profile()),
            DefaultProfile::Created(profile_id(1))
        );
        let before = store.snapshot();

        assert_eq!(
            must(repo.insert_default_profile()),
            DefaultProfile::AlreadyExists
        );
        assert_eq!(store.snapshot(), before);
        assert_eq!(must(repo.find_name(profile_id(1), None)), "My ADI profile");
    }

    #[test]
    fn test_recreated_id_starts_clean() {
        let mocks = MockCollaborators::default();
        let (repo, _store) = create_test_repository(&mocks);

        let id = must(repo.insert("first", "with description"));
        must(repo.delete(id));

        let again = must(repo.insert_profile_data(&option_data(&[(
            PROFILE_NAME_PROPERTY,
            "second",
        )])));
        assert_eq!(again, id);
        assert_eq!(must(repo.find_name(again, None)), "second");
        assert_eq!(must(repo.find_description(again)), "");
    }
}

mod bulk_update {
    use super::*;

    #[test]
    fn test_unmapped_property_leaves_no_trace() {
        let mocks = MockCollaborators::default();
        let (repo, store) = create_test_repository(&mocks);

        must(repo.update_profile_data(
            &option_data(&[("unmapped_property", "value")]),
            profile_id(1),
        ));

        assert!(store.is_empty());
        assert!(mocks.options.calls().is_empty());
    }

    #[test]
    fn test_mapped_property_persists_permission_once() {
        let mocks = MockCollaborators::default();
        let (repo, store) = create_test_repository(&mocks);
        let id = profile_id(7);

        must(repo.update_profile_data(&option_data(&[(PROFILE_NAME_PROPERTY, "X")]), id));

        assert_eq!(
            mocks.options.calls(),
            vec![OptionCall::PersistSanitizedPermission {
                profile_id: id,
                option_name: PROFILE_NAME_PROPERTY.to_string(),
                disposition: PermissionDisposition::DisabledForBlogAdmin,
            }]
        );
        let key = repo.keys().derive_key(id, &PropertyKind::Name);
        assert_eq!(must(store.get(key.as_str())), Some("X".to_string()));
    }

    #[test]
    fn test_option_data_from_json_form() {
        let mocks = MockCollaborators::default();
        let (repo, _store) = create_test_repository(&mocks);

        let data: BTreeMap<String, OptionInput> = must(serde_json::from_str(
            r#"{
                "profile_name": {"option_value": "From the form"},
                "sync_to_ad": {"option_value": "1"}
            }"#,
        ));
        let id = must(repo.insert_profile_data(&data));

        assert_eq!(must(repo.find_name(id, None)), "From the form");
        assert_eq!(mocks.options.persisted_permissions().len(), 1);
    }

    #[test]
    fn test_permission_failure_aborts_before_write() {
        let mocks = MockCollaborators::default();
        mocks.options.fail_option(PROFILE_NAME_PROPERTY);
        let (repo, store) = create_test_repository(&mocks);

        let err = must_err(repo.update_profile_data(
            &option_data(&[(PROFILE_NAME_PROPERTY, "X")]),
            profile_id(1),
        ));
        assert!(matches!(err, ProfileRepositoryError::Collaborator { .. }));
        assert!(store.is_empty());
    }
}

mod cascading_delete {
    use super::*;

    fn cascade_failures(
        err: ProfileRepositoryError,
        expected: ProfileId,
    ) -> Option<Vec<FailedStep>> {
        match err {
            ProfileRepositoryError::CascadeIncomplete {
                profile_id,
                failed_steps,
            } if profile_id == expected => Some(failed_steps),
            _ => None,
        }
    }

    #[test]
    fn test_delete_reaches_every_collaborator() {
        let mocks = MockCollaborators::new(["port", "domain_controllers"]);
        let (repo, _store) = create_test_repository(&mocks);
        let id = must(repo.insert("doomed", ""));

        must(repo.delete(id));

        let calls = mocks.options.calls();
        assert_eq!(calls.len(), 4);
        for option in ["port", "domain_controllers"] {
            assert!(calls.contains(&OptionCall::DeleteValue {
                profile_id: id,
                option_name: option.to_string(),
            }));
            assert!(calls.contains(&OptionCall::DeletePermission {
                profile_id: id,
                option_name: option.to_string(),
            }));
        }
        assert_eq!(mocks.blogs.deleted(), vec![id]);
    }

    #[test]
    fn test_failed_steps_do_not_stop_the_cascade() {
        let mocks = MockCollaborators::new(["port", "domain_controllers"]).with_failing_blogs();
        mocks.options.fail_option("port");
        let (repo, _store) = create_test_repository(&mocks);
        let id = must(repo.insert("doomed", ""));

        let err = must_err(repo.delete(id));
        let failed_steps = must_some(cascade_failures(err, id), "cascade must be incomplete");
        let steps: Vec<&str> = failed_steps.iter().map(|f| f.step.as_str()).collect();
        assert_eq!(
            steps,
            vec![
                "delete value of port",
                "delete permission of port",
                "delete blog associations",
            ]
        );
        assert!(failed_steps.iter().all(|f| matches!(
            f.error,
            ProfileRepositoryError::Collaborator { .. }
        )));

        // Identity keys are gone even though later steps failed.
        assert!(!must(repo.exists(id)));
        assert_eq!(mocks.options.calls().len(), 4);
        assert_eq!(mocks.blogs.deleted(), vec![id]);
    }

    #[test]
    fn test_store_failure_is_reported_and_cascade_continues() {
        let mocks = MockCollaborators::new(["port"]);
        let store = Arc::new(FailingStore::new());
        let repo = must(ProfileRepository::new(
            ProfileRepositoryConfig::default(),
            Arc::clone(&store),
            mocks.collaborators(),
        ));
        let id = must(repo.insert("kept", ""));

        store.set_fail_writes(true);
        let err = must_err(repo.delete(id));
        let failed_steps = must_some(cascade_failures(err, id), "cascade must be incomplete");
        let [failed] = failed_steps.as_slice() else {
            panic!("expected one failed step, got {failed_steps:?}");
        };
        assert_eq!(failed.step, "delete name and description");
        assert!(matches!(
            &failed.error,
            ProfileRepositoryError::StorageWriteFailed {
                key,
                source: StorageError::Unavailable(_),
            } if key == "next_ad_int_p_n_1"
        ));
        assert!(failed.error.is_recoverable());
        assert!(must(repo.exists(id)));
        assert_eq!(mocks.blogs.deleted(), vec![id]);
    }
}

mod write_failures {
    use super::*;

    #[test]
    fn test_insert_surfaces_write_failure() {
        let mocks = MockCollaborators::default();
        let store = FailingStore::new();
        store.set_fail_writes(true);
        let repo = must(ProfileRepository::new(
            ProfileRepositoryConfig::default(),
            store,
            mocks.collaborators(),
        ));

        let err = must_err(repo.insert("never", ""));
        assert!(matches!(err, ProfileRepositoryError::StorageWriteFailed { .. }));
        assert!(err.is_recoverable());
        assert!(repo.store().inner().is_empty());
    }

    #[test]
    fn test_update_name_surfaces_write_failure() {
        let mocks = MockCollaborators::default();
        let store = FailingStore::new();
        let repo = must(ProfileRepository::new(
            ProfileRepositoryConfig::default(),
            store,
            mocks.collaborators(),
        ));
        let id = must(repo.insert("name", ""));

        repo.store().set_fail_writes(true);
        let err = must_err(repo.update_name(id, "other"));
        assert!(matches!(
            err,
            ProfileRepositoryError::StorageWriteFailed { ref key, .. } if key == "next_ad_int_p_n_1"
        ));
        assert_eq!(must(repo.find_name(id, None)), "name");
    }
}

mod tenancy {
    use super::*;

    #[test]
    fn test_single_tenant_lists_nothing() {
        let mocks = MockCollaborators::default().single_tenant();
        let (repo, _store) = create_test_repository(&mocks);
        let id = must(repo.insert("hidden", ""));

        assert!(must(repo.list_all_ids()).is_empty());
        assert!(must(repo.list_all()).is_empty());
        assert_eq!(must(repo.find_name(id, None)), "hidden");
    }
}

mod file_backed {
    use super::*;

    #[test]
    fn test_profiles_survive_reopen() {
        let temp_dir = must(TempDir::new());
        let path = temp_dir.path().join("site-options.json");
        let mocks = MockCollaborators::default();

        {
            let repo = must(ProfileRepository::new(
                ProfileRepositoryConfig::default(),
                must(FileStorage::open(&path)),
                mocks.collaborators(),
            ));
            must(repo.insert_default_profile());
            must(repo.insert("Sales", "Sales blogs"));
        }

        let repo = must(ProfileRepository::new(
            ProfileRepositoryConfig::default(),
            must(FileStorage::open(&path)),
            mocks.collaborators(),
        ));
        assert_eq!(
            must(repo.list_all()),
            vec![
                ProfileSummary {
                    profile_id: profile_id(1),
                    profile_name: "My ADI profile".to_string(),
                },
                ProfileSummary {
                    profile_id: profile_id(2),
                    profile_name: "Sales".to_string(),
                },
            ]
        );
        assert_eq!(
            must(repo.insert_default_profile()),
            DefaultProfile::AlreadyExists
        );
    }

    #[test]
    fn test_file_contains_derived_keys() -> TestResult {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("site-options.json");
        let mocks = MockCollaborators::default();
        let store = must_with(FileStorage::open(&path), "open site options");
        assert_eq!(store.path(), path.as_path());

        let repo = ProfileRepository::new(
            ProfileRepositoryConfig::new("acme_"),
            store,
            mocks.collaborators(),
        )?;
        repo.insert("Profile A", "desc")?;

        let content: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(
            content,
            BTreeMap::from([
                ("acme_p_d_1".to_string(), "desc".to_string()),
                ("acme_p_n_1".to_string(), "Profile A".to_string()),
            ])
        );
        Ok(())
    }
}

mod logging {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_malformed_keys_are_logged() {
        let mocks = MockCollaborators::default();
        let (repo, store) = create_test_repository(&mocks);
        must(store.set("next_ad_int_p_n_draft", "junk"));

        assert!(must(repo.list_all_ids()).is_empty());
        assert!(logs_contain("Skipping key without a valid profile id"));
    }

    #[traced_test]
    #[test]
    fn test_failed_cascade_steps_are_logged() {
        let mocks = MockCollaborators::new(["port"]).with_failing_blogs();
        let (repo, _store) = create_test_repository(&mocks);
        let id = must(repo.insert("doomed", ""));

        let _ = must_err(repo.delete(id));
        assert!(logs_contain("Profile deletion step failed"));
        assert!(logs_contain("delete blog associations"));
    }
}
