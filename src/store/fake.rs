// SPDX-License-Identifier: Apache-2.0

use crate::{Contact, ContactInput, ContactStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory stand-in for the real backends. Tests flip `fail` to exercise
/// the storage-error paths and read `calls` to prove validation rejections
/// never reach the store.
pub struct FakeStore {
    pub contacts: Mutex<Vec<Contact>>,
    pub next_id: AtomicI64,
    pub calls: AtomicU64,
    pub fail: AtomicBool,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            contacts: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            calls: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

impl FakeStore {
    fn check_failure(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail.load(Ordering::Relaxed) {
            Err(StoreError::Backend("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContactStore for FakeStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.check_failure()
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, StoreError> {
        self.check_failure()?;
        let contact = Contact {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: input.name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            created_at: chrono::Utc::now().naive_utc(),
        };
        self.contacts.lock().await.push(contact.clone());
        Ok(contact)
    }

    async fn list_all(&self) -> Result<Vec<Contact>, StoreError> {
        self.check_failure()?;
        let mut contacts = self.contacts.lock().await.clone();
        contacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(contacts)
    }

    async fn update(&self, id: i64, input: &ContactInput) -> Result<u64, StoreError> {
        self.check_failure()?;
        let mut contacts = self.contacts.lock().await;
        match contacts.iter_mut().find(|c| c.id == id) {
            Some(contact) => {
                contact.name = input.name.clone();
                contact.phone = input.phone.clone();
                contact.email = input.email.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        self.check_failure()?;
        let mut contacts = self.contacts.lock().await;
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        Ok((before - contacts.len()) as u64)
    }

    async fn close(&self) {}
}
