use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::debug_panel::DebugPanel;
use crate::engine::debug_panel::bindings::{find_binding, write_binding};
use crate::engine::loading::progress::{AssetLoadFinished, LoadingProgress};
use crate::engine::quality::adaptive::QualityChanged;
use crate::engine::render::parameters::{ParameterValue, PassParameters};
use crate::engine::render::pass_chain::{PassChain, PassKind};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Outgoing message queues, flushed to the host page at the end of each frame.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Plugin establishing the postMessage bridge.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (
                    process_incoming_messages,
                    handle_rpc_messages,
                    forward_viewer_notifications,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener).add_systems(
            Last,
            detach_message_listener.run_if(on_event::<AppExit>),
        );
    }
}

/// Holds the JS callback so it can be removed from the window on teardown.
#[cfg(target_arch = "wasm32")]
pub struct MessageListener {
    closure: Closure<dyn FnMut(MessageEvent)>,
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(world: &mut World) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        // Only string payloads that look like JSON-RPC are queued.
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();
            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    let Some(window) = window() else {
        error!("Window object not available; RPC bridge disabled");
        return;
    };
    if let Err(e) =
        window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
    {
        error!("Failed to register message listener: {:?}", e);
        return;
    }

    world.insert_non_send_resource(MessageListener { closure });
    world.insert_resource(MessageQueue(message_queue));
}

/// Remove the window message listener and stop queueing host messages.
#[cfg(target_arch = "wasm32")]
fn detach_message_listener(world: &mut World) {
    if let Some(listener) = world.remove_non_send_resource::<MessageListener>() {
        if let Some(window) = window() {
            if let Err(e) = window.remove_event_listener_with_callback(
                "message",
                listener.closure.as_ref().unchecked_ref(),
            ) {
                warn!("Failed to remove message listener: {:?}", e);
            }
        }
    }
    world.remove_resource::<MessageQueue>();
}

/// Thread-safe queue filled by the JS message callback.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Raw message received from the host page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Everything an RPC method may read or change.
#[derive(SystemParam)]
pub struct RpcContext<'w> {
    diagnostics: Res<'w, DiagnosticsStore>,
    progress: Res<'w, LoadingProgress>,
    chain: ResMut<'w, PassChain>,
    panel: ResMut<'w, DebugPanel>,
    params: PassParameters<'w>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut context: RpcContext,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) = handle_rpc_request(&request, &mut context) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Discarding malformed RPC message: {}", parse_error);
            }
        }
    }
}

/// Handle one request. Notifications (no id) are executed like any other
/// request but produce no response.
pub fn handle_rpc_request(request: &RpcRequest, context: &mut RpcContext) -> Option<RpcResponse> {
    let result = match request.method.as_str() {
        "get_fps" => handle_get_fps(&context.diagnostics),
        "get_loading_progress" => Ok(context.progress.as_json()),
        "get_pass_chain" => Ok(pass_chain_json(&context.chain)),
        "set_pass_enabled" => handle_set_pass_enabled(&request.params, &mut context.chain),
        "get_pass_parameters" => handle_get_pass_parameters(&request.params, &context.params),
        "set_pass_parameter" => handle_set_pass_parameter(&request.params, &mut context.params),
        "set_debug_panel_visible" => {
            handle_set_debug_panel_visible(&request.params, &mut context.panel)
        }
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            Err(RpcError {
                code: METHOD_NOT_FOUND,
                message: "Method not found".to_string(),
                data: Some(serde_json::json!({"method": request.method})),
            })
        }
    };

    let Some(id) = request.id.clone() else {
        if let Err(error) = &result {
            debug!("Notification {} failed: {}", request.method, error.message);
        }
        return None;
    };

    Some(match result {
        Ok(result_value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        },
        Err(error) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        },
    })
}

fn parse_params<T: for<'de> Deserialize<'de>>(
    params: &serde_json::Value,
    expected: &str,
) -> Result<T, RpcError> {
    serde_json::from_value::<T>(params.clone())
        .map_err(|_| RpcError::invalid_params(&format!("Expected {expected}")))
}

fn handle_get_fps(diagnostics: &DiagnosticsStore) -> Result<serde_json::Value, RpcError> {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps_diagnostic| fps_diagnostic.smoothed())
        .unwrap_or(0.0) as f32;

    Ok(serde_json::json!({
        "fps": fps
    }))
}

fn pass_chain_json(chain: &PassChain) -> serde_json::Value {
    let passes: Vec<_> = chain
        .slots()
        .iter()
        .map(|slot| {
            serde_json::json!({
                "pass": slot.kind,
                "label": slot.kind.label(),
                "enabled": slot.enabled,
                "toggleable": slot.kind.is_toggleable(),
            })
        })
        .collect();
    serde_json::json!({ "passes": passes })
}

fn handle_set_pass_enabled(
    params: &serde_json::Value,
    chain: &mut PassChain,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct SetPassEnabledParams {
        pass: PassKind,
        enabled: bool,
    }

    let parsed: SetPassEnabledParams = parse_params(params, "'pass' and 'enabled' parameters")?;
    let changed = chain
        .set_enabled(parsed.pass, parsed.enabled)
        .map_err(|error| RpcError::invalid_params(&error.to_string()))?;

    info!("Pass {} {}", parsed.pass, if parsed.enabled { "enabled" } else { "disabled" });

    Ok(serde_json::json!({
        "success": true,
        "pass": parsed.pass,
        "enabled": parsed.enabled,
        "changed": changed
    }))
}

fn handle_get_pass_parameters(
    params: &serde_json::Value,
    pass_parameters: &PassParameters,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct GetPassParametersParams {
        pass: PassKind,
    }

    let parsed: GetPassParametersParams = parse_params(params, "'pass' parameter")?;
    let values = pass_parameters
        .snapshot(parsed.pass)
        .map_err(|error| RpcError::invalid_params(&error.to_string()))?;

    let parameters: serde_json::Map<String, serde_json::Value> = values
        .into_iter()
        .map(|(name, value)| {
            let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            (name.to_string(), value)
        })
        .collect();

    Ok(serde_json::json!({
        "pass": parsed.pass,
        "parameters": parameters
    }))
}

fn handle_set_pass_parameter(
    params: &serde_json::Value,
    pass_parameters: &mut PassParameters,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct SetPassParameterParams {
        pass: PassKind,
        name: String,
        value: ParameterValue,
    }

    let parsed: SetPassParameterParams =
        parse_params(params, "'pass', 'name' and 'value' parameters")?;

    // Bound parameters go through the same clamping as the debug panel.
    let changed = match find_binding(parsed.pass, &parsed.name) {
        Some(binding) => write_binding(pass_parameters, binding, parsed.value),
        None => pass_parameters.set(parsed.pass, &parsed.name, parsed.value),
    }
    .map_err(|error| RpcError::invalid_params(&error.to_string()))?;

    let stored = pass_parameters
        .get(parsed.pass)
        .ok()
        .and_then(|set| set.get(&parsed.name))
        .ok_or_else(|| RpcError::internal_error("Parameter vanished after write"))?;

    Ok(serde_json::json!({
        "success": true,
        "pass": parsed.pass,
        "name": parsed.name,
        "value": stored,
        "changed": changed
    }))
}

fn handle_set_debug_panel_visible(
    params: &serde_json::Value,
    panel: &mut DebugPanel,
) -> Result<serde_json::Value, RpcError> {
    #[derive(Deserialize)]
    struct PanelParams {
        visible: bool,
    }

    let parsed: PanelParams = parse_params(params, "'visible' parameter")?;
    panel.visible = parsed.visible;
    if !parsed.visible {
        panel.pointer_captured = false;
    }

    Ok(serde_json::json!({
        "success": true,
        "visible": parsed.visible
    }))
}

/// Push loading, failure and quality updates to the host page.
fn forward_viewer_notifications(
    mut rpc_interface: ResMut<WebRpcInterface>,
    progress: Res<LoadingProgress>,
    mut finished: EventReader<AssetLoadFinished>,
    mut quality_changes: EventReader<QualityChanged>,
) {
    if progress.is_changed() {
        rpc_interface.send_notification("loading_progress", progress.as_json());
    }

    for event in finished.read() {
        if let Err(error) = &event.result {
            rpc_interface.send_notification(
                "asset_load_failed",
                serde_json::json!({
                    "asset": event.asset,
                    "error": error.to_string()
                }),
            );
        }
    }

    for change in quality_changes.read() {
        rpc_interface.send_notification(
            "quality_changed",
            serde_json::json!({
                "reduced": change.reduced,
                "pixel_ratio": change.pixel_ratio
            }),
        );
    }
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::loading::asset_request::ViewerLoadError;
    use crate::engine::loading::progress::{LoadStatus, TrackedAsset};
    use crate::engine::render::parameters::{ToneMappingParameters, init_pass_parameters};
    use bevy::ecs::system::RunSystemOnce;

    fn rpc_app() -> App {
        let mut app = App::new();
        init_pass_parameters(&mut app);
        app.init_resource::<DiagnosticsStore>()
            .init_resource::<LoadingProgress>()
            .init_resource::<PassChain>()
            .init_resource::<DebugPanel>();
        app
    }

    fn call(app: &mut App, method: &str, params: serde_json::Value) -> RpcResponse {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: Some(serde_json::json!(1)),
        };
        app.world_mut()
            .run_system_once_with(
                |In(request): In<RpcRequest>, mut context: RpcContext| {
                    handle_rpc_request(&request, &mut context)
                },
                request,
            )
            .expect("system runs")
            .expect("requests with ids get responses")
    }

    #[test]
    fn set_pass_enabled_toggles_chain() {
        let mut app = rpc_app();
        let response = call(
            &mut app,
            "set_pass_enabled",
            serde_json::json!({"pass": "rgb_shift", "enabled": true}),
        );
        assert!(response.error.is_none());
        assert!(app.world().resource::<PassChain>().is_enabled(PassKind::RgbShift));

        let chain = call(&mut app, "get_pass_chain", serde_json::Value::Null);
        let passes = &chain.result.expect("chain result")["passes"];
        assert_eq!(passes[5]["pass"], "rgb_shift");
        assert_eq!(passes[5]["enabled"], true);
    }

    #[test]
    fn fixed_pass_cannot_be_disabled() {
        let mut app = rpc_app();
        let response = call(
            &mut app,
            "set_pass_enabled",
            serde_json::json!({"pass": "render", "enabled": false}),
        );
        assert_eq!(response.error.map(|error| error.code), Some(INVALID_PARAMS));
    }

    #[test]
    fn unknown_methods_return_method_not_found() {
        let mut app = rpc_app();
        let response = call(&mut app, "tool_selection", serde_json::json!({}));
        assert_eq!(response.error.map(|error| error.code), Some(METHOD_NOT_FOUND));
    }

    #[test]
    fn parameters_are_clamped_like_the_panel() {
        let mut app = rpc_app();
        let response = call(
            &mut app,
            "set_pass_parameter",
            serde_json::json!({"pass": "tone_mapping", "name": "exposure", "value": 9.0}),
        );
        assert_eq!(response.result.expect("set result")["value"], 4.0);
        assert_eq!(app.world().resource::<ToneMappingParameters>().exposure, 4.0);

        let bad = call(
            &mut app,
            "set_pass_parameter",
            serde_json::json!({"pass": "glitch", "name": "go_wild", "value": 1.0}),
        );
        assert_eq!(bad.error.map(|error| error.code), Some(INVALID_PARAMS));
    }

    #[test]
    fn pass_parameters_are_listed_by_name() {
        let mut app = rpc_app();
        let response = call(
            &mut app,
            "get_pass_parameters",
            serde_json::json!({"pass": "reflections"}),
        );
        let result = response.result.expect("parameters result");
        assert_eq!(result["parameters"]["use_secant"], true);
        assert_eq!(result["parameters"]["linear_steps"], 16.0);
    }

    #[test]
    fn panel_visibility_is_remote_controlled() {
        let mut app = rpc_app();
        call(
            &mut app,
            "set_debug_panel_visible",
            serde_json::json!({"visible": true}),
        );
        assert!(app.world().resource::<DebugPanel>().visible);
    }

    fn notify(app: &mut App, method: &str, params: serde_json::Value) -> Option<RpcResponse> {
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: None,
        };
        app.world_mut()
            .run_system_once_with(
                |In(request): In<RpcRequest>, mut context: RpcContext| {
                    handle_rpc_request(&request, &mut context)
                },
                request,
            )
            .expect("system runs")
    }

    #[test]
    fn notifications_get_no_response() {
        let mut app = rpc_app();
        assert!(notify(&mut app, "get_fps", serde_json::Value::Null).is_none());
        assert!(notify(&mut app, "tool_selection", serde_json::json!({})).is_none());
    }

    #[test]
    fn notifications_still_change_state() {
        let mut app = rpc_app();
        let response = notify(
            &mut app,
            "set_pass_enabled",
            serde_json::json!({"pass": "glitch", "enabled": true}),
        );
        assert!(response.is_none());
        assert!(app.world().resource::<PassChain>().is_enabled(PassKind::Glitch));

        notify(
            &mut app,
            "set_debug_panel_visible",
            serde_json::json!({"visible": true}),
        );
        assert!(app.world().resource::<DebugPanel>().visible);
    }

    #[test]
    fn viewer_events_become_notifications() {
        let mut app = App::new();
        app.init_resource::<WebRpcInterface>()
            .init_resource::<LoadingProgress>()
            .add_event::<AssetLoadFinished>()
            .add_event::<QualityChanged>()
            .add_systems(Update, forward_viewer_notifications);
        app.update();
        app.world_mut()
            .resource_mut::<WebRpcInterface>()
            .outgoing_notifications
            .clear();

        app.world_mut().send_event(AssetLoadFinished {
            asset: TrackedAsset::Environment,
            result: Err(ViewerLoadError::Missing {
                path: "env-metal-1.hdr".to_string(),
            }),
        });
        app.world_mut().send_event(AssetLoadFinished {
            asset: TrackedAsset::Model,
            result: Ok(()),
        });
        app.world_mut().send_event(QualityChanged {
            reduced: true,
            pixel_ratio: 1.4,
        });
        app.update();

        let sent = &app.world().resource::<WebRpcInterface>().outgoing_notifications;
        let methods: Vec<&str> = sent.iter().map(|n| n.method.as_str()).collect();
        assert_eq!(methods, vec!["asset_load_failed", "quality_changed"]);
        assert_eq!(sent[0].params["asset"], "environment");
        assert!(
            sent[0].params["error"]
                .as_str()
                .is_some_and(|error| error.contains("env-metal-1.hdr"))
        );
        assert_eq!(sent[1].params["reduced"], true);
    }

    #[test]
    fn progress_changes_are_announced() {
        let mut app = App::new();
        app.init_resource::<WebRpcInterface>()
            .init_resource::<LoadingProgress>()
            .add_event::<AssetLoadFinished>()
            .add_event::<QualityChanged>()
            .add_systems(Update, forward_viewer_notifications);
        app.update();
        app.world_mut()
            .resource_mut::<WebRpcInterface>()
            .outgoing_notifications
            .clear();

        app.update();
        assert!(app.world().resource::<WebRpcInterface>().outgoing_notifications.is_empty());

        app.world_mut()
            .resource_mut::<LoadingProgress>()
            .settle(TrackedAsset::Model, LoadStatus::Loaded);
        app.update();
        let sent = &app.world().resource::<WebRpcInterface>().outgoing_notifications;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "loading_progress");
        assert_eq!(sent[0].params["model"], "loaded");
    }
}
