use auth_rbac::Actor;
use database_layer::Context;
use error_common::{Error, Result};

/// Attach `actor` to a derived context. The parent is left untouched.
pub fn as_actor(ctx: &Context, actor: Actor) -> Context {
    ctx.with_actor(actor)
}

pub fn actor_from_context(ctx: &Context) -> Option<&Actor> {
    ctx.actor()
}

/// The actor, or `NoActor`. Callers must check this before touching the store.
pub(crate) fn require_actor(ctx: &Context) -> Result<&Actor> {
    ctx.actor().ok_or(Error::NoActor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn missing_actor_is_an_error() {
        let ctx = Context::background();
        assert_eq!(require_actor(&ctx).unwrap_err(), Error::NoActor);

        let id = Uuid::new_v4();
        let ctx = as_actor(&ctx, Actor::new(id));
        assert_eq!(actor_from_context(&ctx).map(|a| a.id), Some(id));
    }
}
