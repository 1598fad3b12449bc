//! Per-verb validation of task entries.
//!
//! Each verb has its own set of required fields. Validation turns the raw
//! entries into a [`VerbConfig`] variant holding only well-formed items;
//! items that fail are reported individually and left out so the rest of
//! the batch still runs.

use crate::error::{ConfigError, FabricError, Result};
use crate::model::{Attachment, MAX_VLAN_ID, MAX_VRF_ID, MIN_VLAN_ID, MIN_VRF_ID, Verb, Vrf};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::spec::{AttachEntry, TaskConfig, VrfEntry};

/// Validator for task files.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// A deletion or query target: one VRF, or a whole fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Fabric name.
    pub fabric: String,
    /// VRF name; `None` selects every VRF in the fabric.
    pub vrf_name: Option<String>,
    /// Switch addresses to detach. When non-empty, a deletion only
    /// detaches these switches and keeps the VRF.
    pub switches: Vec<String>,
}

/// Validated desired state, one variant per verb.
#[derive(Debug, Clone)]
pub enum VerbConfig {
    /// VRFs to create or update.
    Merged(Vec<Vrf>),
    /// VRFs to create or update, detaching unlisted attachments.
    Replaced(Vec<Vrf>),
    /// The complete VRF set of the named fabrics.
    Overridden(Vec<Vrf>),
    /// VRFs or fabrics to delete.
    Deleted(Vec<Target>),
    /// VRFs or fabrics to read.
    Query(Vec<Target>),
}

/// Outcome of validating a task.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// Items that passed validation.
    pub desired: VerbConfig,
    /// Items that failed, in entry order.
    pub errors: Vec<ValidationError>,
    /// `(fabric, vrf_name)` of entries that failed validation.
    /// `overridden` leaves these VRFs untouched.
    pub rejected: Vec<(String, String)>,
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a task for its verb.
    ///
    /// # Errors
    ///
    /// Returns an error only when the `config` list is absent or empty;
    /// per-item problems are collected in [`ValidatedConfig::errors`].
    pub fn validate(&self, task: &TaskConfig) -> Result<ValidatedConfig> {
        let verb = task.state;
        let entries = task.entries();

        if entries.is_empty() {
            return Err(FabricError::Config(ConfigError::EmptyConfig {
                state: verb.to_string(),
            }));
        }

        let mut errors = Vec::new();
        let mut rejected = Vec::new();
        let mut vrfs = Vec::new();
        let mut targets = Vec::new();
        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

        for (i, entry) in entries.iter().enumerate() {
            let prefix = format!("config[{i}]");
            let before = errors.len();

            Self::check_shape(entry, &prefix, &mut errors);
            Self::check_required(entry, verb, &prefix, &mut errors);

            if errors.len() > before {
                warn!("Skipping {prefix}: {}", errors[before]);
                if let (Some(fabric), Some(vrf_name)) = (&entry.fabric, &entry.vrf_name) {
                    rejected.push((fabric.clone(), vrf_name.clone()));
                }
                continue;
            }

            let fabric = entry.fabric.clone().unwrap_or_default();
            let key = (fabric.clone(), entry.vrf_name.clone());
            if !seen.insert(key) {
                errors.push(ValidationError {
                    field: format!("{prefix}.vrf_name"),
                    message: format!(
                        "Duplicate entry for {fabric}/{}",
                        entry.vrf_name.as_deref().unwrap_or("*")
                    ),
                });
                continue;
            }

            match verb {
                Verb::Deleted => targets.push(Target {
                    fabric,
                    vrf_name: entry.vrf_name.clone(),
                    switches: entry
                        .attach
                        .iter()
                        .flatten()
                        .filter_map(|a| a.ip_address.clone())
                        .collect(),
                }),
                Verb::Query => targets.push(Target {
                    fabric,
                    vrf_name: entry.vrf_name.clone(),
                    switches: Vec::new(),
                }),
                Verb::Merged | Verb::Replaced | Verb::Overridden => {
                    vrfs.push(Self::build_vrf(entry, fabric));
                }
            }
        }

        let desired = match verb {
            Verb::Merged => VerbConfig::Merged(vrfs),
            Verb::Replaced => VerbConfig::Replaced(vrfs),
            Verb::Overridden => VerbConfig::Overridden(vrfs),
            Verb::Deleted => VerbConfig::Deleted(targets),
            Verb::Query => VerbConfig::Query(targets),
        };

        debug!(
            "Validated {} entries for {verb}: {} errors",
            entries.len(),
            errors.len()
        );

        Ok(ValidatedConfig {
            desired,
            errors,
            rejected,
        })
    }

    /// Checks lengths declared on the entry types and the id ranges.
    fn check_shape(entry: &VrfEntry, prefix: &str, errors: &mut Vec<ValidationError>) {
        if let Err(report) = entry.validate() {
            flatten_errors(prefix, &report, errors);
        }

        check_range(
            entry.vrf_id,
            i64::from(MIN_VRF_ID),
            i64::from(MAX_VRF_ID),
            &format!("{prefix}.vrf_id"),
            errors,
        );
        check_vlan(entry.vlan_id, &format!("{prefix}.vlan_id"), errors);

        for (j, attach) in entry.attach.iter().flatten().enumerate() {
            check_vlan(attach.vlan_id, &format!("{prefix}.attach[{j}].vlan_id"), errors);

            if let Some(ip) = attach.ip_address.as_deref()
                && !ip.is_empty()
                && ip.parse::<Ipv4Addr>().is_err()
            {
                errors.push(ValidationError {
                    field: format!("{prefix}.attach[{j}].ip_address"),
                    message: format!("ip_address '{ip}' is not a valid IPv4 address"),
                });
            }
        }
    }

    /// Checks the fields the verb requires.
    fn check_required(entry: &VrfEntry, verb: Verb, prefix: &str, errors: &mut Vec<ValidationError>) {
        let mut require = |present: bool, field: &str| {
            if !present {
                errors.push(ValidationError {
                    field: format!("{prefix}.{field}"),
                    message: format!("{field} is required for state {verb}"),
                });
            }
        };

        require(entry.fabric.is_some(), "fabric");

        match verb {
            Verb::Merged => require(entry.vrf_name.is_some(), "vrf_name"),
            Verb::Replaced | Verb::Overridden => {
                require(entry.vrf_name.is_some(), "vrf_name");
                require(entry.vrf_id.is_some(), "vrf_id");
            }
            Verb::Deleted | Verb::Query => {}
        }

        if verb.is_mutating() {
            for (j, attach) in entry.attach.iter().flatten().enumerate() {
                require(attach.ip_address.is_some(), &format!("attach[{j}].ip_address"));
            }
        }
    }

    /// Builds a model VRF from an entry that passed validation.
    fn build_vrf(entry: &VrfEntry, fabric: String) -> Vrf {
        let mut vrf = Vrf::new(fabric, entry.vrf_name.clone().unwrap_or_default());
        vrf.vrf_id = entry.vrf_id.and_then(|id| u32::try_from(id).ok());
        vrf.vlan_id = entry.vlan_id.and_then(|id| u16::try_from(id).ok());
        if let Some(template) = &entry.vrf_template {
            vrf.vrf_template.clone_from(template);
        }
        if let Some(template) = &entry.vrf_extension_template {
            vrf.vrf_extension_template.clone_from(template);
        }
        vrf.service_vrf_template.clone_from(&entry.service_vrf_template);
        vrf.template_config = entry.vrf_template_config.clone();
        vrf.attachments = entry.attach.as_ref().map(|list| {
            list.iter()
                .map(|attach| Self::build_attachment(attach, vrf.vlan_id))
                .collect()
        });
        vrf
    }

    fn build_attachment(entry: &AttachEntry, vrf_vlan: Option<u16>) -> Attachment {
        let mut attachment = Attachment::new(
            entry.ip_address.clone().unwrap_or_default(),
            entry.deployment,
        );
        attachment.vlan_id = entry
            .vlan_id
            .and_then(|id| u16::try_from(id).ok())
            .or(vrf_vlan);
        attachment.vrf_lite = entry
            .extension_values
            .as_ref()
            .map(|ext| ext.vrf_lite_conn.clone());
        attachment.freeform_config.clone_from(&entry.freeform_config);
        attachment.instance_values.clone_from(&entry.instance_values);
        attachment
    }
}

fn check_vlan(value: Option<i64>, path: &str, errors: &mut Vec<ValidationError>) {
    check_range(value, i64::from(MIN_VLAN_ID), i64::from(MAX_VLAN_ID), path, errors);
}

/// Pushes an error when a set value falls outside `min..=max`.
fn check_range(value: Option<i64>, min: i64, max: i64, path: &str, errors: &mut Vec<ValidationError>) {
    let Some(value) = value else {
        return;
    };
    if !(min..=max).contains(&value) {
        let field = path.rsplit('.').next().unwrap_or(path);
        errors.push(ValidationError {
            field: path.to_string(),
            message: format!("{field} must be between {min} and {max}, got {value}"),
        });
    }
}

/// Walks a validator report, producing one error per failed field.
fn flatten_errors(prefix: &str, report: &ValidationErrors, out: &mut Vec<ValidationError>) {
    let mut fields: Vec<_> = report.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = format!("{prefix}.{field}");
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let mut message = err
                        .message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid ({})", err.code), ToString::to_string);
                    if let Some(value) = err.params.get("value") {
                        message = format!("{message}, got {value}");
                    }
                    out.push(ValidationError {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

impl ValidatedConfig {
    /// Returns the verb of the validated task.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.desired.verb()
    }

    /// Returns true if validation passed for every item.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the distinct fabrics of the accepted items, in first-seen order.
    #[must_use]
    pub fn fabrics(&self) -> Vec<String> {
        self.desired.fabrics()
    }
}

impl VerbConfig {
    /// Returns the verb this configuration was validated for.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Merged(_) => Verb::Merged,
            Self::Replaced(_) => Verb::Replaced,
            Self::Overridden(_) => Verb::Overridden,
            Self::Deleted(_) => Verb::Deleted,
            Self::Query(_) => Verb::Query,
        }
    }

    /// Returns the number of accepted items.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Merged(v) | Self::Replaced(v) | Self::Overridden(v) => v.len(),
            Self::Deleted(t) | Self::Query(t) => t.len(),
        }
    }

    /// Returns true if no item was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the distinct fabrics of the items, in first-seen order.
    #[must_use]
    pub fn fabrics(&self) -> Vec<String> {
        let names: Vec<&str> = match self {
            Self::Merged(vrfs) | Self::Replaced(vrfs) | Self::Overridden(vrfs) => {
                vrfs.iter().map(|v| v.fabric.as_str()).collect()
            }
            Self::Deleted(targets) | Self::Query(targets) => targets.iter().map(|t| t.fabric.as_str()).collect(),
        };

        let mut fabrics: Vec<String> = Vec::new();
        for name in names {
            if !fabrics.iter().any(|f| f == name) {
                fabrics.push(name.to_string());
            }
        }
        fabrics
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn validate(yaml: &str) -> Result<ValidatedConfig> {
        let task = ConfigParser::new().parse_yaml(yaml, None).expect("yaml");
        ConfigValidator::new().validate(&task)
    }

    #[test]
    fn test_vrf_id_out_of_range() {
        let result = validate(
            r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_id: 9008012000000000
  - fabric: f1
    vrf_name: vrf2
    vrf_id: 9008012
",
        )
        .expect("validated");

        assert_eq!(result.errors.len(), 1);
        let err = &result.errors[0];
        assert_eq!(err.field, "config[0].vrf_id");
        assert!(err.message.contains("vrf_id"));
        assert!(err.message.contains("16777214"));

        let VerbConfig::Merged(vrfs) = &result.desired else {
            panic!("expected merged");
        };
        assert_eq!(vrfs.len(), 1);
        assert_eq!(vrfs[0].vrf_name, "vrf2");
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let result = validate("state: deleted\nconfig: []\n");
        assert!(matches!(
            result,
            Err(FabricError::Config(ConfigError::EmptyConfig { .. }))
        ));

        let result = validate("state: deleted\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_replaced_requires_vrf_id() {
        let result = validate(
            r"
state: replaced
config:
  - fabric: f1
    vrf_name: vrf1
",
        )
        .expect("validated");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "config[0].vrf_id");
        assert!(result.desired.is_empty());
    }

    #[test]
    fn test_deleted_accepts_fabric_only() {
        let result = validate("state: deleted\nconfig:\n  - fabric: f1\n").expect("validated");
        assert!(result.is_valid());
        let VerbConfig::Deleted(targets) = result.desired else {
            panic!("expected deleted");
        };
        assert_eq!(
            targets,
            vec![Target {
                fabric: String::from("f1"),
                vrf_name: None,
                switches: Vec::new(),
            }]
        );
    }

    #[test]
    fn test_attachment_checks() {
        let result = validate(
            r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
    vlan_id: 500
    attach:
      - ip_address: 10.10.10.300
      - ip_address: 10.10.10.224
        vlan_id: 5000
  - fabric: f1
    vrf_name: vrf2
    vlan_id: 600
    attach:
      - ip_address: 10.10.10.225
",
        )
        .expect("validated");

        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"config[0].attach[0].ip_address"));
        assert!(fields.contains(&"config[0].attach[1].vlan_id"));

        let VerbConfig::Merged(vrfs) = &result.desired else {
            panic!("expected merged");
        };
        assert_eq!(vrfs.len(), 1);
        let attachment = &vrfs[0].attachment_list()[0];
        assert_eq!(attachment.vlan_id, Some(600));
        assert!(!attachment.deployment);
    }

    #[test]
    fn test_duplicate_entries() {
        let result = validate(
            r"
state: merged
config:
  - fabric: f1
    vrf_name: vrf1
  - fabric: f1
    vrf_name: vrf1
",
        )
        .expect("validated");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.desired.len(), 1);
    }

    #[test]
    fn test_fabrics_in_order() {
        let result = validate(
            r"
state: query
config:
  - fabric: f2
  - fabric: f1
    vrf_name: vrf1
  - fabric: f2
    vrf_name: vrf9
",
        )
        .expect("validated");
        assert_eq!(result.fabrics(), vec![String::from("f2"), String::from("f1")]);
    }

    #[test]
    fn test_rejected_entries_are_remembered() {
        let result = validate(
            r"
state: overridden
config:
  - fabric: f1
    vrf_name: vrf1
    vrf_id: 0
  - fabric: f1
    vrf_name: vrf2
    vrf_id: 9008012
",
        )
        .expect("validated");

        assert_eq!(result.errors[0].message, "vrf_id must be between 1 and 16777214, got 0");
        assert_eq!(result.rejected, vec![(String::from("f1"), String::from("vrf1"))]);
        assert_eq!(result.desired.len(), 1);
    }

    #[test]
    fn test_deleted_target_carries_switches() {
        let result = validate(
            r"
state: deleted
config:
  - fabric: f1
    vrf_name: vrf1
    attach:
      - ip_address: 10.0.0.2
  - fabric: f1
    vrf_name: vrf2
    attach:
      - deployment: true
",
        )
        .expect("validated");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "config[1].attach[0].ip_address");
        let VerbConfig::Deleted(targets) = result.desired else {
            panic!("expected deleted");
        };
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].switches, vec![String::from("10.0.0.2")]);
    }
}
