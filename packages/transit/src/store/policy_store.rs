//! Policy store: per-name locking, caching and persistence of key policies
//!
//! Every policy name maps to one `tokio::sync::RwLock`. Reads share it;
//! creation, rotation and deletion hold it exclusively for the whole
//! generate-then-persist sequence. Fetched policies come back as
//! [`LockedPolicy`] guards that release the lock when dropped.

use super::storage::Storage;
use crate::config::TransitConfig;
use crate::logging::{PolicyEvent, log_policy_event};
use crate::policy::{KeyPolicy, KeyRingGenerator, PolicyRequest};
use crate::{PolicyError, Result};
use dashmap::DashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::{debug, instrument};

/// A fetched policy, holding the shared lock for its name while alive
///
/// When caching is disabled the policy is a private copy and no lock is held.
pub struct LockedPolicy {
    policy: Arc<KeyPolicy>,
    guard: Option<OwnedRwLockReadGuard<()>>,
}

impl LockedPolicy {
    /// Whether this handle holds the shared lock
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.guard.is_some()
    }
}

impl Deref for LockedPolicy {
    type Target = KeyPolicy;

    fn deref(&self) -> &KeyPolicy {
        &self.policy
    }
}

impl fmt::Debug for LockedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedPolicy")
            .field("policy", &self.policy)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Concurrency-controlled access to key policies in a [`Storage`] backend
pub struct PolicyStore<S> {
    storage: S,
    config: TransitConfig,
    locks: DashMap<String, Arc<RwLock<()>>>,
    cache: DashMap<String, Arc<KeyPolicy>>,
    key_ring_generator: Option<Arc<dyn KeyRingGenerator>>,
}

impl<S: Storage> PolicyStore<S> {
    /// Store over `storage` with the given configuration
    pub fn new(storage: S, config: TransitConfig) -> Self {
        Self {
            storage,
            config,
            locks: DashMap::new(),
            cache: DashMap::new(),
            key_ring_generator: None,
        }
    }

    /// Use `generator` to produce key rings for `openpgp` policies
    #[must_use]
    pub fn with_key_ring_generator(mut self, generator: Arc<dyn KeyRingGenerator>) -> Self {
        self.key_ring_generator = Some(generator);
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TransitConfig {
        &self.config
    }

    /// Underlying storage backend
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fetch `name`, or `None` when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails or the stored record
    /// cannot be decoded.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<LockedPolicy>> {
        if self.config.caching_disabled {
            let policy = self.load(name).await?;
            return Ok(policy.map(|policy| LockedPolicy {
                policy: Arc::new(policy),
                guard: None,
            }));
        }

        let guard = self.lock_for(name).read_owned().await;
        let loaded = match self.cached(name) {
            Some(policy) => Ok(Some(policy)),
            None => self
                .load(name)
                .await
                .map(|policy| policy.map(|policy| self.cache_insert(policy))),
        };

        match loaded {
            Ok(Some(policy)) => Ok(Some(LockedPolicy {
                policy,
                guard: Some(guard),
            })),
            missing => {
                drop(guard);
                self.release_lock(name);
                missing.map(|_| None)
            }
        }
    }

    /// Fetch `request.name`, creating it first when `request.upsert` is set
    ///
    /// Returns the policy and whether this call created it. With `upsert`
    /// off the policy is `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is invalid (checked before anything else)
    /// - Key generation fails
    /// - The storage backend fails
    #[instrument(level = "debug", skip(self, request), fields(name = %request.name))]
    pub async fn get_or_create(
        &self,
        request: &PolicyRequest,
    ) -> Result<(Option<LockedPolicy>, bool)> {
        if !request.upsert {
            return Ok((self.get(&request.name).await?, false));
        }

        request.validate()?;

        if let Some(existing) = self.get(&request.name).await? {
            return Ok((Some(existing), false));
        }

        let lock = self.lock_for(&request.name);
        let write_guard = lock.write_owned().await;

        // another caller may have created it while we waited
        let (policy, created) = match self.current(&request.name).await? {
            Some(existing) => {
                debug!(name = %request.name, "policy created concurrently");
                (existing, false)
            }
            None => {
                let policy = KeyPolicy::create(request, self.key_ring_generator.as_deref())?;
                if let Err(e) = self.persist(&policy).await {
                    log_policy_event(PolicyEvent::Create, &request.name, &e.to_string(), false);
                    return Err(e);
                }
                log_policy_event(
                    PolicyEvent::Create,
                    &request.name,
                    &format!("created {} policy", policy.key_type),
                    true,
                );
                (self.cache_insert(policy), true)
            }
        };

        let guard = if self.config.caching_disabled {
            drop(write_guard);
            None
        } else {
            Some(write_guard.downgrade())
        };

        Ok((
            Some(LockedPolicy {
                policy,
                guard,
            }),
            created,
        ))
    }

    /// Append a new key version to `name` and return its number
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The policy does not exist
    /// - Key generation or persistence fails; the stored policy is unchanged
    #[instrument(level = "debug", skip(self))]
    pub async fn rotate(&self, name: &str) -> Result<u32> {
        let _guard = self.lock_for(name).write_owned().await;

        let current = self
            .current(name)
            .await?
            .ok_or_else(|| PolicyError::PolicyNotFound {
                name: name.to_string(),
            })?;

        let mut policy = KeyPolicy::clone(&current);
        let version = policy.rotate(self.key_ring_generator.as_deref())?;

        if let Err(e) = self.persist(&policy).await {
            log_policy_event(PolicyEvent::Rotate, name, &e.to_string(), false);
            return Err(e);
        }
        self.cache_insert(policy);

        log_policy_event(
            PolicyEvent::Rotate,
            name,
            &format!("rotated to version {version}"),
            true,
        );
        Ok(version)
    }

    /// Delete `name` and every version it holds
    ///
    /// # Errors
    ///
    /// Returns an error if the policy does not exist or the storage backend
    /// fails; on failure the policy is left in place.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        let guard = self.lock_for(name).write_owned().await;

        let result: Result<()> = async {
            if self.current(name).await?.is_none() {
                return Err(PolicyError::PolicyNotFound {
                    name: name.to_string(),
                });
            }
            self.storage.delete(&self.config.storage_key(name)).await?;
            self.cache.remove(name);
            Ok(())
        }
        .await;
        drop(guard);
        self.release_lock(name);

        match &result {
            Ok(()) => log_policy_event(PolicyEvent::Delete, name, "policy deleted", true),
            Err(e) => log_policy_event(PolicyEvent::Delete, name, &e.to_string(), false),
        }
        result
    }

    /// Names of all stored policies in ascending order
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.storage.list(&self.config.storage_prefix).await
    }

    fn lock_for(&self, name: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Drop the lock entry for `name` once no caller holds or awaits it
    fn release_lock(&self, name: &str) {
        self.locks
            .remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn cached(&self, name: &str) -> Option<Arc<KeyPolicy>> {
        if self.config.caching_disabled {
            return None;
        }
        self.cache.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn cache_insert(&self, policy: KeyPolicy) -> Arc<KeyPolicy> {
        let policy = Arc::new(policy);
        if !self.config.caching_disabled {
            self.cache.insert(policy.name.clone(), Arc::clone(&policy));
        }
        policy
    }

    /// Current state of `name`; callers hold the name's lock
    async fn current(&self, name: &str) -> Result<Option<Arc<KeyPolicy>>> {
        if let Some(policy) = self.cached(name) {
            return Ok(Some(policy));
        }
        Ok(self.load(name).await?.map(Arc::new))
    }

    async fn load(&self, name: &str) -> Result<Option<KeyPolicy>> {
        let Some(raw) = self.storage.get(&self.config.storage_key(name)).await? else {
            return Ok(None);
        };
        let policy: KeyPolicy = serde_json::from_slice(&raw)?;
        debug!(name, latest_version = policy.latest_version, "loaded policy from storage");
        Ok(Some(policy))
    }

    async fn persist(&self, policy: &KeyPolicy) -> Result<()> {
        let raw = serde_json::to_vec(policy)?;
        self.storage
            .put(&self.config.storage_key(&policy.name), raw)
            .await
    }
}
