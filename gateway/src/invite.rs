use futures_util::future::BoxFuture;
use strata_models::invite::{Invite, InviteDetails};

use crate::error::GatewayError;

/// The REST side of invites. Implemented by whatever talks to the HTTP API.
pub trait InviteClient: Send + Sync {
    fn details<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<InviteDetails, GatewayError>>;

    /// Joins the guild the invite leads to.
    fn accept<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<InviteDetails, GatewayError>>;

    fn delete<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<(), GatewayError>>;
}

pub trait InviteActions {
    fn details<'a>(
        &'a self,
        client: &'a dyn InviteClient,
    ) -> BoxFuture<'a, Result<InviteDetails, GatewayError>>;

    fn accept<'a>(
        &'a self,
        client: &'a dyn InviteClient,
    ) -> BoxFuture<'a, Result<InviteDetails, GatewayError>>;

    fn delete<'a>(&'a self, client: &'a dyn InviteClient) -> BoxFuture<'a, Result<(), GatewayError>>;
}

impl InviteActions for Invite {
    fn details<'a>(
        &'a self,
        client: &'a dyn InviteClient,
    ) -> BoxFuture<'a, Result<InviteDetails, GatewayError>> {
        client.details(&self.code)
    }

    fn accept<'a>(
        &'a self,
        client: &'a dyn InviteClient,
    ) -> BoxFuture<'a, Result<InviteDetails, GatewayError>> {
        client.accept(&self.code)
    }

    fn delete<'a>(&'a self, client: &'a dyn InviteClient) -> BoxFuture<'a, Result<(), GatewayError>> {
        client.delete(&self.code)
    }
}
