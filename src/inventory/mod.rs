//! Static host inventory.
//!
//! An inventory is loaded from a YAML document with two top-level sections:
//!
//! ```yaml
//! hosts:
//!   web1:
//!     hostname: web1.example.com
//!     username: admin
//!     key_file: ~/.ssh/id_rsa
//!     groups: [webservers]
//!     variables:
//!       http_port: 80
//! groups:
//!   production:
//!     hosts: [web1]
//!     variables:
//!       environment: prod
//! ```
//!
//! Group membership is kept consistent in both directions: a host listed
//! under a group also carries that group in its own `groups`.

mod host;
mod variable;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, error, info};

use crate::error::InventoryError;

pub use host::{Host, DEFAULT_PORT};
pub use variable::{Variable, Variables};

/// Top-level shape of an inventory document.
#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    hosts: Option<Mapping>,
    #[serde(default)]
    groups: Option<Mapping>,
}

/// Body of a `groups` entry.
#[derive(Deserialize, Default)]
struct GroupEntry {
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    variables: Variables,
}

/// Hosts and groups loaded from an inventory document.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: BTreeMap<String, Host>,
    groups: HashMap<String, Vec<String>>,
    group_variables: HashMap<String, Variables>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an inventory from a YAML file.
    pub fn from_source(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            let e = InventoryError::Unreadable {
                path: path.to_path_buf(),
                source,
            };
            error!("Failed to load inventory: {}", e);
            e
        })?;

        debug!("Parsing inventory {}", path.display());
        let inventory = Self::from_yaml_str(&content)?;
        info!("Loaded inventory from {}", path.display());
        debug!(
            "Loaded {} hosts in {} groups",
            inventory.hosts.len(),
            inventory.groups.len()
        );
        Ok(inventory)
    }

    /// Parse an inventory from YAML text. Failures are logged at error level.
    pub fn from_yaml_str(source: &str) -> Result<Self, InventoryError> {
        Self::parse(source).map_err(|e| {
            error!("Failed to parse inventory: {}", e);
            e
        })
    }

    fn parse(source: &str) -> Result<Self, InventoryError> {
        let document: Option<Document> = serde_yaml::from_str(source)?;
        let document = document.ok_or(InventoryError::Empty)?;
        let mut inventory = Self::new();

        for (key, value) in document.hosts.unwrap_or_default() {
            let name = entry_name(key).map_err(|reason| InventoryError::MalformedHost {
                name: "?".into(),
                reason,
            })?;
            let host: Host =
                serde_yaml::from_value(value).map_err(|e| InventoryError::MalformedHost {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            inventory.add_host(name, host);
        }

        for (key, value) in document.groups.unwrap_or_default() {
            let name = entry_name(key).map_err(|reason| InventoryError::MalformedGroup {
                name: "?".into(),
                reason,
            })?;
            let entry: Option<GroupEntry> =
                serde_yaml::from_value(value).map_err(|e| InventoryError::MalformedGroup {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let entry = entry.unwrap_or_default();

            for host_name in &entry.hosts {
                inventory.join(&name, host_name);
            }
            if !entry.variables.is_empty() {
                inventory.group_variables.insert(name, entry.variables);
            }
        }

        Ok(inventory)
    }

    /// Insert or replace a host and register its groups.
    pub fn add_host(&mut self, name: impl Into<String>, mut host: Host) {
        let name = name.into();
        host.dedup_groups();
        for group in &host.groups {
            let members = self.groups.entry(group.clone()).or_default();
            if !members.contains(&name) {
                members.push(name.clone());
            }
        }
        debug!("Added host: {}", name);
        self.hosts.insert(name, host);
    }

    /// Put an existing host into a group. Unknown hosts are skipped.
    fn join(&mut self, group: &str, host_name: &str) {
        let Some(host) = self.hosts.get_mut(host_name) else {
            debug!("Group {} lists unknown host {}, skipping", group, host_name);
            return;
        };
        host.join_group(group);
        let members = self.groups.entry(group.to_string()).or_default();
        if !members.iter().any(|m| m == host_name) {
            members.push(host_name.to_string());
        }
    }

    /// Look up a host by name.
    pub fn get_host(&self, name: &str) -> Result<&Host, InventoryError> {
        self.hosts
            .get(name)
            .ok_or_else(|| InventoryError::HostNotFound(name.to_string()))
    }

    /// Hosts in a group, in the order they joined it.
    pub fn get_group_hosts(&self, group: &str) -> Result<Vec<&Host>, InventoryError> {
        let members = self.group_members(group)?;
        Ok(members.iter().filter_map(|n| self.hosts.get(n)).collect())
    }

    /// Host names in a group, in the order they joined it.
    pub fn group_members(&self, group: &str) -> Result<&[String], InventoryError> {
        self.groups
            .get(group)
            .map(Vec::as_slice)
            .ok_or_else(|| InventoryError::GroupNotFound(group.to_string()))
    }

    /// Variables declared on a group in the `groups` section.
    pub fn group_variables(&self, group: &str) -> Option<&Variables> {
        self.group_variables.get(group)
    }

    /// All hosts, ordered by name.
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &Host)> {
        self.hosts.iter().map(|(name, host)| (name.as_str(), host))
    }

    /// All host names, ordered.
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    /// All group names, sorted.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains_host(&self, name: &str) -> bool {
        self.hosts.contains_key(name)
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

fn entry_name(key: Value) -> Result<String, String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("entry name must be a scalar, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InventoryErrorKind;
    use std::sync::{Arc, Mutex};
    use tracing::{Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn errors_logged(f: impl FnOnce()) -> usize {
        let levels = Levels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());
        tracing::subscriber::with_default(subscriber, f);
        let count = levels.0.lock().unwrap().iter().filter(|l| **l == Level::ERROR).count();
        count
    }

    const SAMPLE: &str = r#"
hosts:
  web1:
    hostname: web1.example.com
    username: admin
    key_file: ~/.ssh/id_rsa
    groups:
      - webservers
      - production
    variables:
      http_port: 80
  db1:
    hostname: db1.example.com
    username: dbadmin
    password: secure_password
    port: 2222
    groups:
      - databases
groups:
  production:
    hosts: [db1, ghost]
    variables:
      environment: prod
  webservers:
    variables:
      nginx_enabled: true
"#;

    #[test]
    fn test_load_sample() {
        let inv = Inventory::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(inv.len(), 2);

        let db1 = inv.get_host("db1").unwrap();
        assert_eq!(db1.port, 2222);
        assert_eq!(db1.password.as_deref(), Some("secure_password"));
        assert!(db1.in_group("production"));

        let web1 = inv.get_host("web1").unwrap();
        assert_eq!(web1.port, DEFAULT_PORT);
        assert_eq!(web1.variables["http_port"], Variable::Integer(80));
    }

    #[test]
    fn test_group_order_is_insertion_order() {
        let inv = Inventory::from_yaml_str(SAMPLE).unwrap();
        let members = inv.group_members("production").unwrap();
        assert_eq!(members, ["web1".to_string(), "db1".to_string()]);
    }

    #[test]
    fn test_unknown_group_member_skipped() {
        let inv = Inventory::from_yaml_str(SAMPLE).unwrap();
        assert!(!inv.contains_host("ghost"));
        assert_eq!(inv.get_group_hosts("production").unwrap().len(), 2);
    }

    #[test]
    fn test_group_variables_kept() {
        let inv = Inventory::from_yaml_str(SAMPLE).unwrap();
        let vars = inv.group_variables("production").unwrap();
        assert_eq!(vars["environment"].as_str(), Some("prod"));
        assert!(inv.group_variables("databases").is_none());
    }

    #[test]
    fn test_missing_hostname_is_malformed() {
        let err = Inventory::from_yaml_str("hosts:\n  web1:\n    username: admin\n").unwrap_err();
        assert_eq!(err.kind(), InventoryErrorKind::MalformedEntry);
        assert!(err.to_string().contains("web1"));
    }

    #[test]
    fn test_null_host_entry_is_malformed() {
        let err = Inventory::from_yaml_str("hosts:\n  web1:\n").unwrap_err();
        assert_eq!(err.kind(), InventoryErrorKind::MalformedEntry);
    }

    #[test]
    fn test_bad_port_is_malformed() {
        let yaml = "hosts:\n  h:\n    hostname: h\n    username: u\n    port: 70000\n";
        let err = Inventory::from_yaml_str(yaml).unwrap_err();
        assert_eq!(err.kind(), InventoryErrorKind::MalformedEntry);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Inventory::from_yaml_str("hosts: [unclosed").unwrap_err();
        assert_eq!(err.kind(), InventoryErrorKind::UnreadableFile);
    }

    #[test]
    fn test_empty_sections() {
        let inv = Inventory::from_yaml_str("hosts:\ngroups:\n").unwrap();
        assert!(inv.is_empty());
        assert!(inv.group_names().is_empty());
    }

    #[test]
    fn test_add_host_idempotent() {
        let mut inv = Inventory::new();
        let host = Host::new("h1", "u").with_group("web");
        inv.add_host("h1", host.clone());
        inv.add_host("h1", host);
        assert_eq!(inv.group_members("web").unwrap(), ["h1".to_string()]);
        assert_eq!(inv.len(), 1);
    }

    #[test]
    fn test_add_host_dedups_own_groups() {
        let mut inv = Inventory::new();
        let mut host = Host::new("h1", "u");
        host.groups = vec!["web".into(), "web".into()];
        inv.add_host("h1", host);
        assert_eq!(inv.get_host("h1").unwrap().groups, vec!["web".to_string()]);
    }

    #[test]
    fn test_lookup_missing() {
        let inv = Inventory::new();
        assert_eq!(
            inv.get_host("missing").unwrap_err().kind(),
            InventoryErrorKind::NotFound
        );
        assert_eq!(
            inv.get_group_hosts("missing").unwrap_err().kind(),
            InventoryErrorKind::NotFound
        );
    }

    #[test]
    fn test_group_names_sorted() {
        let inv = Inventory::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            inv.group_names(),
            vec!["databases", "production", "webservers"]
        );
    }

    #[test]
    fn test_parse_failure_logged_once() {
        let count = errors_logged(|| {
            assert!(Inventory::from_yaml_str("hosts:\n  web1:\n    username: admin\n").is_err());
        });
        assert_eq!(count, 1);

        let count = errors_logged(|| {
            assert!(Inventory::from_yaml_str(SAMPLE).is_ok());
        });
        assert_eq!(count, 0);
    }
}
