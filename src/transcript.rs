//! Mirror of the chat conversation into a lead's CRM description.
//!
//! Appending is read-modify-write against the CRM with no version check.
//! Two appends racing on the same lead can both read the old description,
//! and the later write drops the earlier line.

use crate::crm::LeadStore;
use crate::error::Result;
use crate::types::TranscriptEntry;

/// `previous` followed by a newline and `"<author>: <text>"`. An empty
/// `previous` still gets the leading newline.
pub fn appended_description(previous: &str, author: &str, text: &str) -> String {
    format!("{previous}\n{author}: {text}")
}

pub async fn append(leads: &dyn LeadStore, entry: &TranscriptEntry) -> Result<()> {
    let previous = leads.read_description(&entry.lead_id).await?;
    let description = appended_description(&previous, &entry.author, &entry.text);
    leads
        .write_description(&entry.lead_id, &description)
        .await?;
    tracing::debug!(lead_id = %entry.lead_id, author = %entry.author, "transcript appended");
    Ok(())
}

pub async fn lead_description(leads: &dyn LeadStore, lead_id: &str) -> Result<String> {
    leads.read_description(lead_id).await
}
