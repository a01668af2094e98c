//! Subnet discovery with optional auto-import.
//!
//! The workflow always scans first. When importing is requested, alive hosts
//! from the scan become [`ImportCandidate`]s and are submitted in one import
//! call; with no alive hosts the import result is synthesized locally.

use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{BackendRequest, BackendResult, InventoryBackend};
use crate::error::BackendError;

pub const SCAN_PATH: &str = "/api/discovery/scan";
pub const IMPORT_PATH: &str = "/api/discovery/import";

/// Entity type for hosts the scanner could not classify.
const FALLBACK_TYPE: &str = "misc";

/// Fingerprint value the scanner reports when it has nothing.
const UNKNOWN_FINGERPRINT: &str = "Unknown";

/// Scan parameters, forwarded to the backend as given.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryParams {
    pub cidr: String,
    pub concurrency: Value,
    pub timeout: Value,
    pub import_alive: bool,
}

impl DiscoveryParams {
    pub fn scan_request(&self) -> BackendRequest {
        BackendRequest::post(
            SCAN_PATH,
            Some(json!({
                "cidr": self.cidr,
                "concurrency": self.concurrency,
                "timeout": self.timeout,
            })),
        )
    }
}

/// A host as reported by the backend scanner.
///
/// Read leniently from the raw scan entry: a field with an unexpected shape
/// counts as absent, so one odd field never hides an alive host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredHost {
    pub ip: Option<String>,
    pub alive: bool,
    pub suggested_type: Option<String>,
    pub suggested_name: Option<String>,
    pub hostname: Option<String>,
    pub fingerprint: Option<String>,
    pub open_ports: Vec<u16>,
    pub http_title: Option<String>,
    pub ssh_banner: Option<String>,
}

impl DiscoveredHost {
    pub fn from_entry(entry: &Value) -> Self {
        Self {
            ip: text(entry, "ip"),
            alive: entry.get("alive").is_some_and(truthy),
            suggested_type: text(entry, "suggested_type"),
            suggested_name: text(entry, "suggested_name"),
            hostname: text(entry, "hostname"),
            fingerprint: text(entry, "fingerprint"),
            open_ports: ports(entry),
            http_title: text(entry, "http_title"),
            ssh_banner: text(entry, "ssh_banner"),
        }
    }
}

/// Non-empty string field.
fn text(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Port numbers, given as integers or numeric strings. Anything else is
/// dropped.
fn ports(entry: &Value) -> Vec<u16> {
    let Some(ports) = entry.get("open_ports").and_then(Value::as_array) else {
        return Vec::new();
    };
    ports
        .iter()
        .filter_map(|port| match port {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

/// null, false, 0 and "" are not alive.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Record submitted to the backend's import endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportCandidate {
    pub ip: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    pub hostname: String,
    pub notes: String,
}

impl ImportCandidate {
    fn new(ip: &str, host: &DiscoveredHost) -> Self {
        Self {
            ip: ip.to_string(),
            entity_type: host.suggested_type.as_deref().unwrap_or(FALLBACK_TYPE).to_string(),
            name: host.suggested_name.as_deref().unwrap_or(ip).to_string(),
            hostname: host.hostname.as_deref().unwrap_or(ip).to_string(),
            notes: notes(host),
        }
    }
}

impl TryFrom<&DiscoveredHost> for ImportCandidate {
    type Error = BackendError;

    /// Fails when the host has no IP address to import it under.
    fn try_from(host: &DiscoveredHost) -> Result<Self, Self::Error> {
        match host.ip.as_deref() {
            Some(ip) => Ok(Self::new(ip, host)),
            None => Err(BackendError::new(
                None,
                "Malformed scan response: alive host without an ip",
            )),
        }
    }
}

/// Newline-joined notes: fingerprint, open ports, HTTP title, SSH banner.
/// Missing or empty entries are left out.
pub fn notes(host: &DiscoveredHost) -> String {
    let mut lines = Vec::new();
    if let Some(fingerprint) = host
        .fingerprint
        .as_deref()
        .filter(|f| *f != UNKNOWN_FINGERPRINT)
    {
        lines.push(format!("Fingerprint: {}", fingerprint));
    }
    if !host.open_ports.is_empty() {
        let ports: Vec<String> = host.open_ports.iter().map(u16::to_string).collect();
        lines.push(format!("Open ports: {}", ports.join(", ")));
    }
    if let Some(title) = &host.http_title {
        lines.push(format!("HTTP title: {}", title));
    }
    if let Some(banner) = &host.ssh_banner {
        lines.push(format!("SSH banner: {}", banner));
    }
    lines.join("\n")
}

/// Hosts listed under the scan's `hosts` key.
pub fn scanned_hosts(scan: &Value) -> Vec<DiscoveredHost> {
    scan.get("hosts")
        .and_then(Value::as_array)
        .map(|hosts| hosts.iter().map(DiscoveredHost::from_entry).collect())
        .unwrap_or_default()
}

/// Import candidates for every alive host in a scan result. An alive host
/// that cannot be imported fails the whole batch.
pub fn import_candidates(scan: &Value) -> BackendResult<Vec<ImportCandidate>> {
    let hosts = scanned_hosts(scan);
    let candidates = hosts
        .iter()
        .filter(|host| host.alive)
        .map(ImportCandidate::try_from)
        .collect::<BackendResult<Vec<_>>>()?;
    let skipped = hosts.len() - candidates.len();
    if skipped > 0 {
        debug!("{} scanned hosts not alive", skipped);
    }
    Ok(candidates)
}

/// Import result reported when there was nothing to import.
pub fn empty_import_result() -> Value {
    json!({ "imported": 0, "by_type": {}, "errors": [] })
}

/// Import call still to be made after a successful scan.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImport {
    pub scan: Value,
    pub candidates: Vec<ImportCandidate>,
}

impl PendingImport {
    pub fn request(&self) -> BackendRequest {
        BackendRequest::post(IMPORT_PATH, Some(json!({ "hosts": self.candidates })))
    }

    pub fn finish(self, import: Value) -> Value {
        json!({ "scan": self.scan, "import": import })
    }
}

/// Where the workflow stands once the scan has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryStep {
    /// No further backend calls; the value is the tool result.
    Done(Value),
    /// Alive hosts found; the import call is next.
    Importing(PendingImport),
}

impl DiscoveryStep {
    pub fn after_scan(scan: Value, import_alive: bool) -> BackendResult<Self> {
        if !import_alive {
            return Ok(DiscoveryStep::Done(scan));
        }
        let candidates = import_candidates(&scan)?;
        if candidates.is_empty() {
            return Ok(DiscoveryStep::Done(
                json!({ "scan": scan, "import": empty_import_result() }),
            ));
        }
        Ok(DiscoveryStep::Importing(PendingImport { scan, candidates }))
    }
}

/// Run the workflow. Any backend failure, scan or import, fails the whole
/// call.
pub async fn run<B: InventoryBackend>(backend: &B, params: &DiscoveryParams) -> BackendResult<Value> {
    info!("Scanning {}", params.cidr);
    let scan = backend.send(params.scan_request()).await?;

    match DiscoveryStep::after_scan(scan, params.import_alive)? {
        DiscoveryStep::Done(result) => Ok(result),
        DiscoveryStep::Importing(pending) => {
            info!("Importing {} alive hosts from {}", pending.candidates.len(), params.cidr);
            let import = backend.send(pending.request()).await?;
            Ok(pending.finish(import))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBackend;
    use crate::client::Method;

    fn host(value: Value) -> DiscoveredHost {
        DiscoveredHost::from_entry(&value)
    }

    fn candidate(value: Value) -> ImportCandidate {
        ImportCandidate::try_from(&host(value)).unwrap()
    }

    fn params(import_alive: bool) -> DiscoveryParams {
        DiscoveryParams {
            cidr: "10.0.0.0/24".to_string(),
            concurrency: json!(50),
            timeout: json!(1.0),
            import_alive,
        }
    }

    #[test]
    fn test_candidate_fallbacks() {
        let c = candidate(json!({
            "ip": "10.0.0.5",
            "alive": true,
            "fingerprint": "Unknown",
            "open_ports": [],
            "suggested_type": null
        }));
        assert_eq!(
            c,
            ImportCandidate {
                ip: "10.0.0.5".to_string(),
                entity_type: "misc".to_string(),
                name: "10.0.0.5".to_string(),
                hostname: "10.0.0.5".to_string(),
                notes: String::new(),
            }
        );
    }

    #[test]
    fn test_candidate_uses_suggestions() {
        let c = candidate(json!({
            "ip": "10.0.0.9",
            "alive": true,
            "fingerprint": "nginx/1.18",
            "open_ports": [80, 443],
            "http_title": "Welcome",
            "suggested_type": "apps",
            "suggested_name": "web1"
        }));
        assert_eq!(c.entity_type, "apps");
        assert_eq!(c.name, "web1");
        assert_eq!(c.hostname, "10.0.0.9");
        assert_eq!(
            c.notes,
            "Fingerprint: nginx/1.18\nOpen ports: 80, 443\nHTTP title: Welcome"
        );
    }

    #[test]
    fn test_notes_full_order() {
        let h = host(json!({
            "ip": "10.0.0.2",
            "alive": true,
            "hostname": "pve",
            "fingerprint": "OpenSSH 9.2",
            "open_ports": [22],
            "http_title": "Proxmox",
            "ssh_banner": "SSH-2.0-OpenSSH_9.2"
        }));
        assert_eq!(
            notes(&h),
            "Fingerprint: OpenSSH 9.2\nOpen ports: 22\nHTTP title: Proxmox\nSSH banner: SSH-2.0-OpenSSH_9.2"
        );
        assert_eq!(ImportCandidate::try_from(&h).unwrap().hostname, "pve");
    }

    #[test]
    fn test_notes_skip_empty_strings() {
        let h = host(json!({
            "ip": "10.0.0.3",
            "alive": true,
            "fingerprint": "",
            "http_title": "",
            "ssh_banner": "SSH-2.0-dropbear",
            "suggested_name": ""
        }));
        assert_eq!(notes(&h), "SSH banner: SSH-2.0-dropbear");
        assert_eq!(ImportCandidate::try_from(&h).unwrap().name, "10.0.0.3");
    }

    #[test]
    fn test_candidate_serializes_type_field() {
        let c = candidate(json!({"ip": "10.0.0.7", "alive": true}));
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["type"], "misc");
        assert!(value.get("entity_type").is_none());
    }

    #[test]
    fn test_alive_truthiness() {
        let scan = json!({"hosts": [
            {"ip": "10.0.0.1", "alive": true},
            {"ip": "10.0.0.2", "alive": false},
            {"ip": "10.0.0.3"},
            {"ip": "10.0.0.4", "alive": 1},
            {"ip": "10.0.0.5", "alive": null}
        ]});
        let ips: Vec<String> = import_candidates(&scan)
            .unwrap()
            .into_iter()
            .map(|c| c.ip)
            .collect();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.4"]);
    }

    #[test]
    fn test_malformed_fields_count_as_absent() {
        let scan = json!({"hosts": [
            {"ip": "10.0.0.1", "alive": true, "open_ports": [80, "http", "8443", 70000]},
            {"ip": "10.0.0.2", "alive": true, "hostname": 42, "suggested_type": ["apps"]}
        ]});
        let candidates = import_candidates(&scan).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].notes, "Open ports: 80, 8443");
        assert_eq!(candidates[1].hostname, "10.0.0.2");
        assert_eq!(candidates[1].entity_type, "misc");
    }

    #[test]
    fn test_alive_host_without_ip_fails() {
        let scan = json!({"hosts": [
            {"ip": "10.0.0.1", "alive": true},
            {"ip": 17, "alive": true}
        ]});
        let err = import_candidates(&scan).unwrap_err();
        assert_eq!(err.status_code, None);
        assert!(err.message.contains("without an ip"));
    }

    #[test]
    fn test_non_object_entries_are_not_alive() {
        let scan = json!({"hosts": ["garbage", 7, {"ip": "10.0.0.2", "alive": true}]});
        let hosts = scanned_hosts(&scan);
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts.iter().filter(|h| h.alive).count(), 1);
        assert_eq!(import_candidates(&scan).unwrap().len(), 1);

        assert!(scanned_hosts(&json!({"total": 0})).is_empty());
    }

    #[test]
    fn test_step_without_import_returns_scan() {
        let scan = json!({"hosts": [{"ip": "10.0.0.1", "alive": true}]});
        assert_eq!(
            DiscoveryStep::after_scan(scan.clone(), false).unwrap(),
            DiscoveryStep::Done(scan)
        );
    }

    #[test]
    fn test_step_with_no_alive_hosts_synthesizes_import() {
        let scan = json!({"hosts": [{"ip": "10.0.0.1", "alive": false}]});
        let step = DiscoveryStep::after_scan(scan.clone(), true).unwrap();
        assert_eq!(
            step,
            DiscoveryStep::Done(json!({
                "scan": scan,
                "import": {"imported": 0, "by_type": {}, "errors": []}
            }))
        );
    }

    #[test]
    fn test_step_with_alive_hosts_requests_import() {
        let scan = json!({"hosts": [{"ip": "10.0.0.1", "alive": true}]});
        let DiscoveryStep::Importing(pending) = DiscoveryStep::after_scan(scan.clone(), true).unwrap()
        else {
            panic!("expected Importing");
        };
        let request = pending.request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, IMPORT_PATH);
        assert_eq!(
            request.body,
            Some(json!({"hosts": [{
                "ip": "10.0.0.1",
                "type": "misc",
                "name": "10.0.0.1",
                "hostname": "10.0.0.1",
                "notes": ""
            }]}))
        );
        assert_eq!(
            pending.finish(json!({"imported": 1})),
            json!({"scan": scan, "import": {"imported": 1}})
        );
    }

    #[tokio::test]
    async fn test_run_scan_only() {
        let scan = json!({"hosts": [{"ip": "10.0.0.1", "alive": true}]});
        let backend = MockBackend::with_responses([Ok(scan.clone())]);
        let result = run(&backend, &params(false)).await.unwrap();
        assert_eq!(result, scan);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, SCAN_PATH);
        assert_eq!(
            requests[0].body,
            Some(json!({"cidr": "10.0.0.0/24", "concurrency": 50, "timeout": 1.0}))
        );
    }

    #[tokio::test]
    async fn test_run_import_skipped_when_nothing_alive() {
        let backend = MockBackend::with_responses([Ok(json!({"hosts": []}))]);
        let result = run(&backend, &params(true)).await.unwrap();
        assert_eq!(result["import"], empty_import_result());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_scan_then_import() {
        let scan = json!({"hosts": [
            {"ip": "10.0.0.9", "alive": true, "suggested_type": "apps"},
            {"ip": "10.0.0.10", "alive": false}
        ]});
        let import = json!({"imported": 1, "by_type": {"apps": 1}, "errors": []});
        let backend = MockBackend::with_responses([Ok(scan.clone()), Ok(import.clone())]);

        let result = run(&backend, &params(true)).await.unwrap();
        assert_eq!(result, json!({"scan": scan, "import": import}));

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].path, IMPORT_PATH);
        assert_eq!(requests[1].body.as_ref().unwrap()["hosts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_imports_hosts_with_odd_fields() {
        let scan = json!({"hosts": [
            {"ip": "10.0.0.1", "alive": true, "open_ports": [80, "http"]},
            {"ip": "10.0.0.2", "alive": true, "hostname": 42}
        ]});
        let backend = MockBackend::with_responses([Ok(scan), Ok(json!({"imported": 2}))]);
        let result = run(&backend, &params(true)).await.unwrap();
        assert_eq!(result["import"], json!({"imported": 2}));

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let hosts = &requests[1].body.as_ref().unwrap()["hosts"];
        assert_eq!(hosts[0]["notes"], "Open ports: 80");
        assert_eq!(hosts[1]["hostname"], "10.0.0.2");
    }

    #[tokio::test]
    async fn test_run_scan_failure_stops_workflow() {
        let backend = MockBackend::with_responses([Err(BackendError::new(Some(400), "bad cidr"))]);
        let err = run(&backend, &params(true)).await.unwrap_err();
        assert_eq!(err.message, "bad cidr");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_run_import_failure_is_not_partial_success() {
        let backend = MockBackend::with_responses([
            Ok(json!({"hosts": [{"ip": "10.0.0.1", "alive": true}]})),
            Err(BackendError::new(Some(500), "import broke")),
        ]);
        let err = run(&backend, &params(true)).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: import broke");
        assert_eq!(backend.call_count(), 2);
    }
}
