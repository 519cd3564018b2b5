//! Integration tests for the full registration/approval pipeline.
//!
//! Tests: RegistrationHandler → directory → LifecycleGate → authenticate
//!
//! Verifies:
//! - Accounts are created pending and cannot log in until approved
//! - Status transitions are admin-gated, idempotent, and immediately visible
//! - Failure paths leave no half-initialized accounts behind

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use anteroom_accounts::{
        AccountStatus, Actor, ActorId, AuthError, Candidate, Capability, GateError, IdentityStore,
        LifecycleGate, MetadataStore, RegistrationError, RegistrationHandler, STATUS_KEY,
        StoreError,
    };
    use anteroom_core::AccountId;

    use crate::InMemoryDirectory;

    type Handler = RegistrationHandler<Arc<InMemoryDirectory>, Arc<InMemoryDirectory>>;
    type Gate = LifecycleGate<Arc<InMemoryDirectory>, Arc<InMemoryDirectory>>;

    fn setup() -> (Arc<InMemoryDirectory>, Handler, Gate) {
        anteroom_observability::init();
        let dir = Arc::new(InMemoryDirectory::new());
        let handler = RegistrationHandler::new(dir.clone(), dir.clone());
        let gate = LifecycleGate::new(dir.clone(), dir.clone());
        (dir, handler, gate)
    }

    fn admin() -> Actor {
        Actor::admin(ActorId::new())
    }

    fn alice() -> Candidate {
        Candidate {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "pw123".to_string(),
            phone_number: "555-0100".to_string(),
        }
    }

    #[test]
    fn full_lifecycle_register_approve_reject_reapprove() {
        let (_dir, handler, gate) = setup();
        let admin = admin();

        let alice_id = handler.register(&alice()).unwrap();
        assert_eq!(gate.get_status(alice_id).unwrap(), AccountStatus::Pending);

        // Pending blocks login even with correct credentials.
        assert_eq!(
            gate.authenticate("alice", "pw123").unwrap_err(),
            AuthError::PendingApproval
        );

        // Approval is visible to the very next login attempt.
        gate.set_account_status(alice_id, AccountStatus::Approved, &admin)
            .unwrap();
        assert_eq!(gate.authenticate("alice", "pw123").unwrap(), alice_id);

        // Rejection blocks again, with its own outcome.
        gate.set_account_status(alice_id, AccountStatus::Rejected, &admin)
            .unwrap();
        assert_eq!(
            gate.authenticate("alice", "pw123").unwrap_err(),
            AuthError::RegistrationDenied
        );

        // The admin override model allows re-approving a rejected account.
        gate.set_account_status(alice_id, AccountStatus::Approved, &admin)
            .unwrap();
        assert_eq!(gate.authenticate("alice", "pw123").unwrap(), alice_id);
    }

    #[test]
    fn credentials_are_checked_before_status_is_consulted() {
        let (_dir, handler, gate) = setup();

        let alice_id = handler.register(&alice()).unwrap();
        gate.set_account_status(alice_id, AccountStatus::Approved, &admin())
            .unwrap();

        // Wrong password and unknown username are indistinguishable; neither
        // reveals account existence or status.
        assert_eq!(
            gate.authenticate("alice", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            gate.authenticate("nobody", "pw123").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn duplicate_registration_creates_no_account() {
        let (dir, handler, _gate) = setup();
        handler.register(&alice()).unwrap();

        let same_username = Candidate {
            email: "alice2@example.com".to_string(),
            ..alice()
        };
        let same_email = Candidate {
            username: "alice2".to_string(),
            ..alice()
        };

        for dup in [same_username, same_email] {
            assert_eq!(
                handler.register(&dup).unwrap_err(),
                RegistrationError::DuplicateIdentity
            );
        }
        assert_eq!(dir.list().len(), 1);
    }

    #[test]
    fn concurrent_registrations_of_one_identity_admit_exactly_one() {
        let (dir, _handler, _gate) = setup();

        let results: Vec<_> = std::thread::scope(|s| {
            (0..4)
                .map(|_| {
                    let dir = dir.clone();
                    s.spawn(move || {
                        RegistrationHandler::new(dir.clone(), dir).register(&alice())
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| *e == RegistrationError::DuplicateIdentity)
        );
        assert_eq!(dir.list().len(), 1);
    }

    #[test]
    fn transitions_require_the_admin_capability() {
        let (_dir, handler, gate) = setup();
        let alice_id = handler.register(&alice()).unwrap();

        let bystander = Actor::new(ActorId::new(), vec![Capability::new("reports.read")]);
        assert_eq!(
            gate.set_account_status(alice_id, AccountStatus::Approved, &bystander)
                .unwrap_err(),
            GateError::Unauthorized
        );

        // Status untouched; login still blocked.
        assert_eq!(gate.get_status(alice_id).unwrap(), AccountStatus::Pending);
        assert_eq!(
            gate.authenticate("alice", "pw123").unwrap_err(),
            AuthError::PendingApproval
        );
    }

    #[test]
    fn double_approve_is_idempotent() {
        let (_dir, handler, gate) = setup();
        let admin = admin();
        let alice_id = handler.register(&alice()).unwrap();

        gate.set_account_status(alice_id, AccountStatus::Approved, &admin)
            .unwrap();
        gate.set_account_status(alice_id, AccountStatus::Approved, &admin)
            .unwrap();

        assert_eq!(gate.get_status(alice_id).unwrap(), AccountStatus::Approved);
        assert_eq!(gate.authenticate("alice", "pw123").unwrap(), alice_id);
    }

    #[test]
    fn unknown_account_is_not_found() {
        let (_dir, _handler, gate) = setup();
        let ghost = AccountId::new();

        assert_eq!(
            gate.set_account_status(ghost, AccountStatus::Approved, &admin())
                .unwrap_err(),
            GateError::NotFound
        );
        assert_eq!(gate.get_status(ghost).unwrap_err(), GateError::NotFound);
    }

    /// Delegating wrapper that can refuse metadata writes or serve corrupt
    /// metadata, to exercise the failure paths the real directory cannot
    /// produce.
    struct FaultyMeta {
        inner: Arc<InMemoryDirectory>,
        refuse_writes: AtomicBool,
        serve_corrupt: AtomicBool,
        hide_status: AtomicBool,
    }

    impl FaultyMeta {
        fn new(inner: Arc<InMemoryDirectory>) -> Self {
            Self {
                inner,
                refuse_writes: AtomicBool::new(false),
                serve_corrupt: AtomicBool::new(false),
                hide_status: AtomicBool::new(false),
            }
        }
    }

    impl IdentityStore for FaultyMeta {
        fn create_account(
            &self,
            username: &str,
            email: &str,
            password: &str,
        ) -> Result<AccountId, StoreError> {
            self.inner.create_account(username, email, password)
        }

        fn verify_credentials(
            &self,
            username: &str,
            password: &str,
        ) -> Result<AccountId, StoreError> {
            self.inner.verify_credentials(username, password)
        }

        fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
            self.inner.username_exists(username)
        }

        fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
            self.inner.email_exists(email)
        }

        fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError> {
            self.inner.remove_account(account_id)
        }
    }

    impl MetadataStore for FaultyMeta {
        fn set_meta(&self, account_id: AccountId, key: &str, value: &str) -> Result<(), StoreError> {
            if self.refuse_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("meta write refused".to_string()));
            }
            self.inner.set_meta(account_id, key, value)
        }

        fn get_meta(&self, account_id: AccountId, key: &str) -> Result<Option<String>, StoreError> {
            if key == STATUS_KEY && self.serve_corrupt.load(Ordering::SeqCst) {
                return Ok(Some("limbo".to_string()));
            }
            if key == STATUS_KEY && self.hide_status.load(Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get_meta(account_id, key)
        }
    }

    #[test]
    fn metadata_failure_rolls_registration_back() {
        anteroom_observability::init();
        let dir = Arc::new(InMemoryDirectory::new());
        let faulty = Arc::new(FaultyMeta::new(dir.clone()));
        let handler = RegistrationHandler::new(faulty.clone(), faulty.clone());

        faulty.refuse_writes.store(true, Ordering::SeqCst);
        let err = handler.register(&alice()).unwrap_err();
        assert!(matches!(err, RegistrationError::IdentityStore(_)));
        assert!(dir.list().is_empty());

        // The identity is free again once the store recovers.
        faulty.refuse_writes.store(false, Ordering::SeqCst);
        handler.register(&alice()).unwrap();
        assert_eq!(dir.list().len(), 1);
    }

    #[test]
    fn uninitialized_account_cannot_log_in() {
        anteroom_observability::init();
        let dir = Arc::new(InMemoryDirectory::new());
        let faulty = Arc::new(FaultyMeta::new(dir.clone()));
        let handler = RegistrationHandler::new(faulty.clone(), faulty.clone());
        let gate = LifecycleGate::new(faulty.clone(), faulty.clone());

        handler.register(&alice()).unwrap();
        faulty.hide_status.store(true, Ordering::SeqCst);

        // Valid credentials, but no status on record: fail closed.
        assert_eq!(
            gate.authenticate("alice", "pw123").unwrap_err(),
            AuthError::InvalidStatus("missing".to_string())
        );
    }

    #[test]
    fn corrupt_stored_status_fails_closed_and_is_repairable() {
        anteroom_observability::init();
        let dir = Arc::new(InMemoryDirectory::new());
        let faulty = Arc::new(FaultyMeta::new(dir.clone()));
        let handler = RegistrationHandler::new(faulty.clone(), faulty.clone());
        let gate = LifecycleGate::new(faulty.clone(), faulty.clone());

        let alice_id = handler.register(&alice()).unwrap();
        faulty.serve_corrupt.store(true, Ordering::SeqCst);

        // Reads refuse the out-of-set value; login fails closed.
        assert_eq!(
            gate.get_status(alice_id).unwrap_err(),
            GateError::InvalidStatus("limbo".to_string())
        );
        assert_eq!(
            gate.authenticate("alice", "pw123").unwrap_err(),
            AuthError::InvalidStatus("limbo".to_string())
        );

        // An admin write replaces the corrupt value rather than erroring.
        gate.set_account_status(alice_id, AccountStatus::Approved, &admin())
            .unwrap();
        faulty.serve_corrupt.store(false, Ordering::SeqCst);
        assert_eq!(gate.get_status(alice_id).unwrap(), AccountStatus::Approved);
    }
}
