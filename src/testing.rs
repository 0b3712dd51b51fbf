//! In-memory stand-ins for the CRM and the chat directory.

use std::collections::{BTreeSet, HashMap};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Barrier;

use crate::crm::LeadStore;
use crate::error::{Error, Result};
use crate::stream::{ChannelSpec, ChatDirectory};
use crate::token;
use crate::types::ChatUser;

#[derive(Default)]
pub struct InMemoryLeads {
    pub descriptions: Mutex<HashMap<String, String>>,
    pub writes: AtomicUsize,
    pub fail_reads: bool,
    /// Held after each read so concurrent appends interleave read, read,
    /// write, write.
    pub read_barrier: Option<Arc<Barrier>>,
}

impl InMemoryLeads {
    pub fn with_lead(lead_id: &str, description: &str) -> Self {
        let leads = Self::default();
        leads
            .descriptions
            .lock()
            .expect("leads lock")
            .insert(lead_id.to_string(), description.to_string());
        leads
    }

    pub fn description(&self, lead_id: &str) -> Option<String> {
        self.descriptions
            .lock()
            .expect("leads lock")
            .get(lead_id)
            .cloned()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeads {
    async fn read_description(&self, lead_id: &str) -> Result<String> {
        if self.fail_reads {
            return Err(Error::UpstreamStatus {
                service: "crm".to_string(),
                status: 401,
                body: "invalid token".to_string(),
            });
        }
        let description = self.description(lead_id).unwrap_or_default();
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        Ok(description)
    }

    async fn write_description(&self, lead_id: &str, description: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.descriptions
            .lock()
            .expect("leads lock")
            .insert(lead_id.to_string(), description.to_string());
        Ok(())
    }

    async fn list_leads(&self) -> Result<Vec<Value>> {
        let descriptions = self.descriptions.lock().expect("leads lock");
        let mut leads = descriptions
            .iter()
            .map(|(id, description)| json!({ "id": id, "description": description }))
            .collect::<Vec<_>>();
        leads.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(leads)
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub users: Mutex<HashMap<String, ChatUser>>,
    pub channels: Mutex<HashMap<String, ChannelSpec>>,
    pub members: Mutex<HashMap<String, BTreeSet<String>>>,
    pub channel_creations: AtomicUsize,
    pub fail_upserts: bool,
}

impl FakeDirectory {
    pub const API_KEY: &'static str = "test-key";
    pub const SECRET: &'static str = "test-secret";

    pub fn channel_count(&self) -> usize {
        self.channels.lock().expect("channels lock").len()
    }

    pub fn members_of(&self, channel_id: &str) -> Vec<String> {
        self.members
            .lock()
            .expect("members lock")
            .get(channel_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatDirectory for FakeDirectory {
    async fn upsert_users(&self, users: &[ChatUser]) -> Result<()> {
        if self.fail_upserts {
            return Err(Error::upstream("stream", "connection refused"));
        }
        let mut known = self.users.lock().expect("users lock");
        for user in users {
            known.insert(user.id.clone(), user.clone());
        }
        Ok(())
    }

    async fn get_or_create_channel(&self, channel: &ChannelSpec) -> Result<String> {
        let mut channels = self.channels.lock().expect("channels lock");
        if !channels.contains_key(&channel.id) {
            self.channel_creations.fetch_add(1, Ordering::SeqCst);
            channels.insert(channel.id.clone(), channel.clone());
        }
        Ok(channel.id.clone())
    }

    async fn add_members(&self, channel_id: &str, user_ids: &[String]) -> Result<()> {
        self.members
            .lock()
            .expect("members lock")
            .entry(channel_id.to_string())
            .or_default()
            .extend(user_ids.iter().cloned());
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> Result<String> {
        token::user_token(Self::SECRET, user_id, None)
    }

    fn api_key(&self) -> &str {
        Self::API_KEY
    }
}
