use log::info;

use crate::AppData;
use crate::backend::NodeScope;
use crate::flow::FormFlow;
use crate::forms::NodeForm;
use crate::models::{IdType, NewNode, Node, NodeStatus, StatusChoice, User, UserId};
use crate::security::PermissionCheckable;
use crate::web::errors::{ServiceError, ServiceResult};

/// Admins see every node unless they ask for one owner, users only their own.
pub fn list_nodes(app: &AppData, user: &User, owner: Option<UserId>) -> ServiceResult<Vec<Node>> {
    let scope = match owner {
        Some(owner) => {
            user.ensure_owner_visible(&owner)?;
            NodeScope::OwnedBy(owner)
        },
        None if user.is_admin() => NodeScope::All,
        None => NodeScope::OwnedBy(user.id),
    };

    app.store.list_nodes(&scope)
}

pub fn find_node(app: &AppData, user: &User, id: IdType) -> ServiceResult<Node> {
    let node = app.store.find_node(id)?
        .ok_or_else(|| ServiceError::NotFound("Node".to_string()))?;
    user.ensure_node_visible(&node)?;
    Ok(node)
}

pub fn register_node(app: &AppData, user: &User, form: &NodeForm) -> ServiceResult<Node> {
    let mut flow = FormFlow::new("register_node");
    let valid = flow.validate(|| form.validate())?;

    flow.submit(|| {
        let node = app.store.insert_node(&NewNode {
            user_id: user.id,
            user_email: user.email.clone(),
            phone: valid.phone.clone(),
            node_id: valid.node_id.clone(),
            location: valid.location.clone(),
            total_sensors: valid.total_sensors,
            status: NodeStatus::Pending.to_db().to_string(),
        })?;

        info!("Node {} ({}) registered by {}", node.id, node.node_id, user.email);
        Ok(node)
    })
}

/// Overwrites the status, no history is kept.
pub fn update_node_status(app: &AppData, user: &User, id: IdType, status: StatusChoice) -> ServiceResult<Node> {
    user.ensure_admin()?;

    let status = NodeStatus::from(status);
    let node = app.store.update_node_status(id, status.to_db())?;

    info!("Node {} ({}) set to {} by {}", node.id, node.node_id, status, user.email);
    Ok(node)
}

/// Sensor rows of the node identifier survive the delete.
pub fn delete_node(app: &AppData, user: &User, id: IdType, confirmed: bool) -> ServiceResult<()> {
    user.ensure_admin()?;

    if !confirmed {
        return Err(ServiceError::BadRequest("Node deletion must be confirmed".to_string()))
    }

    app.store.delete_node(id)?;
    info!("Node {} deleted by {}", id, user.email);
    Ok(())
}
