//! In-memory NDFC 12 controller for tests.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use crate::error::{ControllerError, Result};

use super::paths::V12_VERSION_PATH;
use super::transport::{ControllerRequest, ControllerResponse, ControllerTransport, HttpMethod};

const PREFIX: &str = "/appcenter/cisco/ndfc/api/v1/lan-fabric/rest";

#[derive(Debug, Default)]
pub struct FakeController {
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    fabrics: BTreeMap<String, FakeFabric>,
    calls: Vec<ControllerRequest>,
    failures: Vec<Failure>,
    network_down: bool,
}

/// An injected non-success answer.
#[derive(Debug)]
struct Failure {
    method: HttpMethod,
    path_fragment: String,
    body_fragment: Option<String>,
    code: u16,
}

#[derive(Debug, Default)]
struct FakeFabric {
    switches: Vec<(String, String)>,
    vrfs: Vec<FakeVrf>,
}

#[derive(Debug)]
struct FakeVrf {
    name: String,
    id: u32,
    template: String,
    extension_template: String,
    config: Map<String, Value>,
    status: String,
    scripted: VecDeque<String>,
    attachments: Vec<FakeAttachment>,
}

#[derive(Debug)]
struct FakeAttachment {
    serial: String,
    vlan: i64,
    deployment: bool,
    extension_values: String,
}

type Answer = (u16, Value);

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fabric(&self, fabric: &str, switches: &[(&str, &str)]) {
        let mut state = self.lock();
        state.fabrics.insert(
            fabric.to_string(),
            FakeFabric {
                switches: switches
                    .iter()
                    .map(|(ip, serial)| ((*ip).to_string(), (*serial).to_string()))
                    .collect(),
                vrfs: Vec::new(),
            },
        );
    }

    pub fn seed_vrf(&self, fabric: &str, name: &str, id: u32, vlan: u16) {
        let mut state = self.lock();
        let fabric = state.fabrics.get_mut(fabric).expect("fabric seeded");
        let mut config = Map::new();
        config.insert(String::from("vrfVlanId"), json!(vlan.to_string()));
        fabric.vrfs.push(FakeVrf {
            name: name.to_string(),
            id,
            template: String::from("Default_VRF_Universal"),
            extension_template: String::from("Default_VRF_Extension_Universal"),
            config,
            status: String::from("NA"),
            scripted: VecDeque::new(),
            attachments: Vec::new(),
        });
    }

    pub fn seed_config_value(&self, fabric: &str, vrf: &str, key: &str, value: &str) {
        self.with_vrf(fabric, vrf, |v| {
            v.config.insert(key.to_string(), json!(value));
        });
    }

    pub fn seed_attachment(&self, fabric: &str, vrf: &str, ip: &str, deployment: bool) {
        let serial = {
            let state = self.lock();
            state.fabrics[fabric]
                .switches
                .iter()
                .find(|(i, _)| i == ip)
                .map(|(_, s)| s.clone())
                .expect("switch seeded")
        };
        self.with_vrf(fabric, vrf, |v| {
            let vlan = v
                .config
                .get("vrfVlanId")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            v.attachments.push(FakeAttachment {
                serial,
                vlan,
                deployment,
                extension_values: String::new(),
            });
            if deployment {
                v.status = String::from("DEPLOYED");
            }
        });
    }

    /// Statuses reported by successive VRF reads; the last one sticks.
    pub fn script_status(&self, fabric: &str, vrf: &str, statuses: &[&str]) {
        self.with_vrf(fabric, vrf, |v| {
            v.scripted = statuses.iter().map(|s| (*s).to_string()).collect();
        });
    }

    pub fn fail_on(&self, method: HttpMethod, path_fragment: &str, code: u16) {
        self.lock().failures.push(Failure {
            method,
            path_fragment: path_fragment.to_string(),
            body_fragment: None,
            code,
        });
    }

    /// Like `fail_on`, restricted to calls whose JSON body contains `body_fragment`.
    pub fn fail_on_body(&self, method: HttpMethod, path_fragment: &str, body_fragment: &str, code: u16) {
        self.lock().failures.push(Failure {
            method,
            path_fragment: path_fragment.to_string(),
            body_fragment: Some(body_fragment.to_string()),
            code,
        });
    }

    pub fn go_offline(&self) {
        self.lock().network_down = true;
    }

    pub fn calls(&self) -> Vec<ControllerRequest> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<(HttpMethod, String)> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method.is_mutating())
            .map(|c| (c.method, c.path.trim_start_matches(PREFIX).to_string()))
            .collect()
    }

    pub fn vrf_names(&self, fabric: &str) -> Vec<String> {
        self.lock().fabrics[fabric]
            .vrfs
            .iter()
            .map(|v| v.name.clone())
            .collect()
    }

    /// `(serial, deployment)` of each attachment of a VRF.
    pub fn attachments(&self, fabric: &str, vrf: &str) -> Vec<(String, bool)> {
        self.lock().fabrics[fabric]
            .vrfs
            .iter()
            .find(|v| v.name == vrf)
            .map(|v| {
                v.attachments
                    .iter()
                    .map(|a| (a.serial.clone(), a.deployment))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake controller lock")
    }

    fn with_vrf(&self, fabric: &str, vrf: &str, f: impl FnOnce(&mut FakeVrf)) {
        let mut state = self.lock();
        let vrf = state
            .fabrics
            .get_mut(fabric)
            .and_then(|fab| fab.vrfs.iter_mut().find(|v| v.name == vrf))
            .expect("vrf seeded");
        f(vrf);
    }
}

#[async_trait]
impl ControllerTransport for FakeController {
    async fn send(&self, request: ControllerRequest) -> Result<ControllerResponse> {
        let mut state = self.lock();
        state.calls.push(request.clone());

        if state.network_down {
            return Err(ControllerError::network("connection refused").into());
        }

        let body = request.body.as_ref().map(Value::to_string).unwrap_or_default();
        let injected = state
            .failures
            .iter()
            .find(|f| {
                f.method == request.method
                    && request.path.contains(f.path_fragment.as_str())
                    && f.body_fragment.as_deref().is_none_or(|b| body.contains(b))
            })
            .map(|f| f.code);

        let (code, data) = match injected {
            Some(code) => (code, json!({"message": "injected failure"})),
            None => state.route(&request),
        };

        Ok(ControllerResponse {
            method: request.method,
            path: request.path,
            return_code: code,
            message: String::from(if (200..300).contains(&code) { "OK" } else { "ERROR" }),
            data,
        })
    }
}

impl FakeState {
    fn route(&mut self, request: &ControllerRequest) -> Answer {
        if request.path == V12_VERSION_PATH {
            return (200, json!({"version": "12.2.1"}));
        }
        let Some(rest) = request.path.strip_prefix(PREFIX) else {
            return not_found();
        };
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let parts: Vec<&str> = rest.trim_start_matches('/').split('/').collect();

        match (request.method, parts.as_slice()) {
            (HttpMethod::Get, ["control", "fabrics", fabric]) => {
                if self.fabrics.contains_key(*fabric) {
                    (200, json!({"fabricName": fabric}))
                } else {
                    not_found()
                }
            }
            (HttpMethod::Get, ["control", "fabrics", fabric, "inventory", "switchesByFabric"]) => {
                self.fabric(fabric).map_or_else(not_found, |fab| {
                    let switches: Vec<Value> = fab
                        .switches
                        .iter()
                        .map(|(ip, serial)| {
                            json!({"ipAddress": ip, "serialNumber": serial, "switchRole": "leaf"})
                        })
                        .collect();
                    (200, Value::Array(switches))
                })
            }
            (HttpMethod::Get, ["top-down", "fabrics", fabric, "vrfinfo"]) => {
                if self.fabrics.contains_key(*fabric) {
                    (200, json!({"l3vni": 50000}))
                } else {
                    not_found()
                }
            }
            (HttpMethod::Get, ["top-down", "fabrics", fabric, "vrfs"]) => self.list_vrfs(fabric),
            (HttpMethod::Post, ["top-down", "fabrics", fabric, "vrfs"]) => {
                self.create_vrf(fabric, request.body.as_ref())
            }
            (HttpMethod::Get, ["top-down", "fabrics", fabric, "vrfs", "attachments"]) => {
                self.list_attachments(fabric, query)
            }
            (HttpMethod::Post, ["top-down", "fabrics", fabric, "vrfs", "attachments"]) => {
                self.attach(fabric, request.body.as_ref(), true)
            }
            (HttpMethod::Delete, ["top-down", "fabrics", fabric, "vrfs", "attachments"]) => {
                self.attach(fabric, request.body.as_ref(), false)
            }
            (HttpMethod::Post, ["top-down", "fabrics", fabric, "vrfs", "deployments"]) => {
                self.deploy(fabric, request.body.as_ref())
            }
            (HttpMethod::Put, ["top-down", "fabrics", fabric, "vrfs", name]) => {
                self.update_vrf(fabric, name, request.body.as_ref())
            }
            (HttpMethod::Delete, ["top-down", "fabrics", fabric, "vrfs", name]) => {
                self.delete_vrf(fabric, name)
            }
            _ => not_found(),
        }
    }

    fn fabric(&mut self, fabric: &str) -> Option<&mut FakeFabric> {
        self.fabrics.get_mut(fabric)
    }

    fn list_vrfs(&mut self, fabric: &str) -> Answer {
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };
        let vrfs: Vec<Value> = fab
            .vrfs
            .iter_mut()
            .map(|v| {
                if let Some(next) = v.scripted.pop_front() {
                    if v.scripted.is_empty() {
                        v.scripted.push_back(next.clone());
                    }
                    v.status = next;
                }
                json!({
                    "fabric": fabric,
                    "vrfName": v.name,
                    "vrfId": v.id,
                    "vrfTemplate": v.template,
                    "vrfExtensionTemplate": v.extension_template,
                    "vrfTemplateConfig": Value::Object(v.config.clone()).to_string(),
                    "vrfStatus": v.status,
                })
            })
            .collect();
        (200, Value::Array(vrfs))
    }

    fn list_attachments(&mut self, fabric: &str, query: &str) -> Answer {
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };
        let names: Vec<&str> = query
            .strip_prefix("vrf-names=")
            .map(|q| q.split(',').collect())
            .unwrap_or_default();

        let items: Vec<Value> = fab
            .vrfs
            .iter()
            .filter(|v| names.is_empty() || names.contains(&v.name.as_str()))
            .map(|v| {
                let list: Vec<Value> = fab
                    .switches
                    .iter()
                    .map(|(ip, serial)| {
                        let attached = v.attachments.iter().find(|a| &a.serial == serial);
                        json!({
                            "vrfName": v.name,
                            "ipAddress": ip,
                            "serialNumber": serial,
                            "vlanId": attached.map_or(0, |a| a.vlan),
                            "isLanAttached": attached.is_some(),
                            "deployment": attached.is_some_and(|a| a.deployment),
                            "lanAttachState": match attached {
                                Some(a) if a.deployment => "DEPLOYED",
                                Some(_) => "PENDING",
                                None => "NA",
                            },
                            "extensionValues": attached.map(|a| a.extension_values.clone()).unwrap_or_default(),
                        })
                    })
                    .collect();
                json!({"vrfName": v.name, "lanAttachList": list})
            })
            .collect();
        (200, Value::Array(items))
    }

    fn create_vrf(&mut self, fabric: &str, body: Option<&Value>) -> Answer {
        let Some(body) = body else {
            return bad_request("missing body");
        };
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };
        let name = body["vrfName"].as_str().unwrap_or_default().to_string();
        if fab.vrfs.iter().any(|v| v.name == name) {
            return bad_request("VRF already exists");
        }
        let config = body["vrfTemplateConfig"]
            .as_str()
            .and_then(|s| serde_json::from_str::<Map<String, Value>>(s).ok())
            .unwrap_or_default();
        fab.vrfs.push(FakeVrf {
            name,
            id: body["vrfId"].as_u64().and_then(|id| u32::try_from(id).ok()).unwrap_or(0),
            template: body["vrfTemplate"].as_str().unwrap_or_default().to_string(),
            extension_template: body["vrfExtensionTemplate"].as_str().unwrap_or_default().to_string(),
            config,
            status: String::from("NA"),
            scripted: VecDeque::new(),
            attachments: Vec::new(),
        });
        (200, body.clone())
    }

    fn update_vrf(&mut self, fabric: &str, name: &str, body: Option<&Value>) -> Answer {
        let Some(body) = body else {
            return bad_request("missing body");
        };
        let Some(vrf) = self
            .fabric(fabric)
            .and_then(|fab| fab.vrfs.iter_mut().find(|v| v.name == name))
        else {
            return not_found();
        };
        if body["vrfId"].as_u64() != Some(u64::from(vrf.id)) {
            return bad_request("vrfId cannot be changed");
        }
        if let Some(config) = body["vrfTemplateConfig"]
            .as_str()
            .and_then(|s| serde_json::from_str::<Map<String, Value>>(s).ok())
        {
            vrf.config = config;
        }
        (200, body.clone())
    }

    fn delete_vrf(&mut self, fabric: &str, name: &str) -> Answer {
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };
        let Some(index) = fab.vrfs.iter().position(|v| v.name == name) else {
            return not_found();
        };
        if !fab.vrfs[index].attachments.is_empty() {
            return bad_request("VRF is still attached");
        }
        fab.vrfs.remove(index);
        (200, Value::Null)
    }

    fn attach(&mut self, fabric: &str, body: Option<&Value>, attach: bool) -> Answer {
        let Some(items) = body.and_then(Value::as_array) else {
            return bad_request("expected a list");
        };
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };

        let mut results = Map::new();
        for item in items {
            let vrf_name = item["vrfName"].as_str().unwrap_or_default();
            let Some(vrf) = fab.vrfs.iter_mut().find(|v| v.name == vrf_name) else {
                return not_found();
            };
            for entry in item["lanAttachList"].as_array().into_iter().flatten() {
                let serial = entry["serialNumber"].as_str().unwrap_or_default().to_string();
                if !fab.switches.iter().any(|(_, s)| *s == serial) {
                    return bad_request("unknown switch");
                }
                results.insert(format!("{vrf_name}-[{serial}]"), json!("SUCCESS"));
                vrf.attachments.retain(|a| a.serial != serial);
                if attach {
                    vrf.attachments.push(FakeAttachment {
                        serial,
                        vlan: entry["vlanId"].as_i64().unwrap_or(0),
                        deployment: entry["deployment"].as_bool().unwrap_or(false),
                        extension_values: entry["extensionValues"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
            }
        }
        (200, Value::Object(results))
    }

    fn deploy(&mut self, fabric: &str, body: Option<&Value>) -> Answer {
        let names: Vec<String> = body
            .and_then(|b| b["vrfNames"].as_str())
            .map(|s| s.split(',').map(String::from).collect())
            .unwrap_or_default();
        let Some(fab) = self.fabric(fabric) else {
            return not_found();
        };
        for vrf in fab.vrfs.iter_mut().filter(|v| names.contains(&v.name)) {
            vrf.status = String::from("DEPLOYED");
        }
        (200, json!({"status": "Deployment of VRF(s) has been initiated successfully"}))
    }
}

fn not_found() -> Answer {
    (404, json!({"message": "not found"}))
}

fn bad_request(message: &str) -> Answer {
    (400, json!({"message": message}))
}
