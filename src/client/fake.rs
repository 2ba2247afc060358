//! In-memory backend double for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Backend, CheckTarget};
use crate::data::{ServiceDraft, ServiceRecord};
use crate::error::{ClientError, Result};

#[derive(Debug, Default)]
struct State {
    services: Vec<ServiceRecord>,
    history: HashMap<String, Vec<f64>>,
    fail_loads: Option<ClientError>,
    fail_mutations: Option<ClientError>,
    /// `last_checked` stamped onto services when a check is triggered.
    check_stamp: Option<DateTime<Utc>>,
    authenticated: bool,
    calls: Vec<String>,
}

/// Scriptable backend that records every call it receives.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn with_services(services: Vec<ServiceRecord>) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.services = services;
            state.authenticated = true;
        }
        fake
    }

    pub fn set_services(&self, services: Vec<ServiceRecord>) {
        self.state.lock().unwrap().services = services;
    }

    pub fn set_history(&self, id: &str, samples: Vec<f64>) {
        self.state.lock().unwrap().history.insert(id.to_string(), samples);
    }

    pub fn fail_loads(&self, error: Option<ClientError>) {
        self.state.lock().unwrap().fail_loads = error;
    }

    pub fn fail_mutations(&self, error: Option<ClientError>) {
        self.state.lock().unwrap().fail_mutations = error;
    }

    /// Make triggered checks complete immediately with this timestamp.
    pub fn complete_checks_at(&self, ts: DateTime<Utc>) {
        self.state.lock().unwrap().check_stamp = Some(ts);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn load_error(&self) -> Option<ClientError> {
        self.state.lock().unwrap().fail_loads.clone()
    }

    fn mutation_error(&self) -> Option<ClientError> {
        self.state.lock().unwrap().fail_mutations.clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_services(&self) -> Result<Vec<ServiceRecord>> {
        self.log("list".into());
        if let Some(err) = self.load_error() {
            return Err(err);
        }
        Ok(self.state.lock().unwrap().services.clone())
    }

    async fn get_service(&self, id: &str) -> Result<ServiceRecord> {
        self.log(format!("get:{}", id));
        if let Some(err) = self.load_error() {
            return Err(err);
        }
        self.state
            .lock()
            .unwrap()
            .services
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    async fn upsert_service(&self, draft: &ServiceDraft) -> Result<()> {
        self.log(format!("upsert:{}", draft.id));
        if let Some(err) = self.mutation_error() {
            return Err(err);
        }
        let mut state = self.state.lock().unwrap();
        state.services.retain(|s| s.id != draft.id);
        let mut record = ServiceRecord::new(&draft.id, &draft.name, &draft.host);
        record.port = draft.port;
        record.protocol = draft.protocol.clone();
        record.path = draft.path.clone();
        record.env = draft.env.clone();
        record.active = draft.active;
        state.services.push(record);
        Ok(())
    }

    async fn delete_service(&self, id: &str) -> Result<()> {
        self.log(format!("delete:{}", id));
        if let Some(err) = self.mutation_error() {
            return Err(err);
        }
        self.state.lock().unwrap().services.retain(|s| s.id != id);
        Ok(())
    }

    async fn trigger_check(&self, target: &CheckTarget) -> Result<()> {
        match target {
            CheckTarget::All => self.log("check:*".into()),
            CheckTarget::One(id) => self.log(format!("check:{}", id)),
        }
        if let Some(err) = self.mutation_error() {
            return Err(err);
        }
        let mut state = self.state.lock().unwrap();
        if let Some(stamp) = state.check_stamp {
            for service in state.services.iter_mut() {
                let targeted = match target {
                    CheckTarget::All => service.active,
                    CheckTarget::One(id) => &service.id == id,
                };
                if targeted {
                    service.last_checked = Some(stamp);
                }
            }
        }
        Ok(())
    }

    async fn history(&self, id: &str) -> Result<Vec<f64>> {
        self.log(format!("history:{}", id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn login(&self, password: &str) -> Result<()> {
        self.log("login".into());
        if password == "letmein" {
            self.state.lock().unwrap().authenticated = true;
            Ok(())
        } else {
            Err(ClientError::Unauthorized)
        }
    }

    async fn logout(&self) -> Result<()> {
        self.log("logout".into());
        self.state.lock().unwrap().authenticated = false;
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.state.lock().unwrap().authenticated
    }

    fn description(&self) -> &str {
        "fake"
    }
}
