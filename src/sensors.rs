use crate::AppData;
use crate::models::{Sensor, User};
use crate::security::PermissionCheckable;
use crate::web::errors::{ServiceError, ServiceResult};

/// Every reading stored under `node_identifier`, unpaged.
///
/// An unknown identifier with no readings is an empty list, not an error.
/// Identifiers are not unique, so readings of every node sharing one are
/// returned together.
pub fn list_sensors(app: &AppData, user: &User, node_identifier: &str) -> ServiceResult<Vec<Sensor>> {
    let node_identifier = node_identifier.trim();
    if node_identifier.is_empty() {
        return Err(ServiceError::validation("nodeId", "Node identifier is required"))
    }

    user.ensure_node_identifier_visible(app, node_identifier)?;
    app.store.list_sensors(node_identifier)
}
