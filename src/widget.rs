//! Bank-link widget state machine.
//!
//! ```text
//! idle -> token-requested -> token-ready -> widget-open -> success -> exchanging -> done
//!                \                               \                       \
//!                 failed <-------------------------+--(exit: idle)--------- failed
//! ```
//!
//! The token is requested once per mount. `Open` is only legal once a token is
//! present and the hosted SDK has reported readiness. Token and exchange
//! failures land in [`LinkState::Failed`] with a message for the user;
//! [`LinkEvent::Retry`] goes back to [`LinkState::Idle`].
//!
//! An illegal event returns [`TransitionError`] and leaves the state as it was.

use crate::{
    Error,
    aggregator::LinkToken,
    api::handlers::bank::{LinkTokenRelay, types::LinkedItem},
    identity::Account,
};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    TokenRequested,
    TokenReady { token: LinkToken },
    WidgetOpen { token: LinkToken },
    Success { public_token: String },
    Exchanging,
    Done { item_id: String },
    Failed { message: String },
}

impl LinkState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TokenRequested => "token-requested",
            Self::TokenReady { .. } => "token-ready",
            Self::WidgetOpen { .. } => "widget-open",
            Self::Success { .. } => "success",
            Self::Exchanging => "exchanging",
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Mount,
    TokenIssued(LinkToken),
    TokenFailed(String),
    SdkReady,
    Open,
    /// The hosted widget finished and handed back a public token.
    Success(String),
    Exit,
    ExchangeStarted,
    Exchanged(String),
    ExchangeFailed(String),
    Retry,
}

impl LinkEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::TokenIssued(_) => "token-issued",
            Self::TokenFailed(_) => "token-failed",
            Self::SdkReady => "sdk-ready",
            Self::Open => "open",
            Self::Success(_) => "success",
            Self::Exit => "exit",
            Self::ExchangeStarted => "exchange-started",
            Self::Exchanged(_) => "exchanged",
            Self::ExchangeFailed(_) => "exchange-failed",
            Self::Retry => "retry",
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal event {event} in state {state}")]
    Illegal {
        state: &'static str,
        event: &'static str,
    },
    #[error("the linking SDK is not ready")]
    SdkNotReady,
}

#[derive(Debug)]
pub struct LinkWidget {
    state: LinkState,
    sdk_ready: bool,
}

impl Default for LinkWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkWidget {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            sdk_ready: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    #[must_use]
    pub fn sdk_ready(&self) -> bool {
        self.sdk_ready
    }

    /// The "connect bank" control is usable only in this combination.
    #[must_use]
    pub fn button_enabled(&self) -> bool {
        self.sdk_ready && matches!(self.state, LinkState::TokenReady { .. })
    }

    /// # Errors
    /// [`TransitionError`] when `event` is not legal in the current state.
    pub fn apply(&mut self, event: LinkEvent) -> Result<&LinkState, TransitionError> {
        // readiness is orthogonal to the token flow and may arrive at any time
        if event == LinkEvent::SdkReady {
            self.sdk_ready = true;
            return Ok(&self.state);
        }

        let next = match (&self.state, event) {
            (LinkState::Idle, LinkEvent::Mount) => LinkState::TokenRequested,
            (LinkState::TokenRequested, LinkEvent::TokenIssued(token)) => {
                LinkState::TokenReady { token }
            }
            (LinkState::TokenRequested, LinkEvent::TokenFailed(message))
            | (LinkState::Exchanging, LinkEvent::ExchangeFailed(message)) => {
                LinkState::Failed { message }
            }
            (LinkState::TokenReady { token }, LinkEvent::Open) => {
                if !self.sdk_ready {
                    return Err(TransitionError::SdkNotReady);
                }
                LinkState::WidgetOpen {
                    token: token.clone(),
                }
            }
            (LinkState::WidgetOpen { .. }, LinkEvent::Success(public_token)) => {
                LinkState::Success { public_token }
            }
            (LinkState::WidgetOpen { .. }, LinkEvent::Exit)
            | (LinkState::Failed { .. }, LinkEvent::Retry) => LinkState::Idle,
            (LinkState::Success { .. }, LinkEvent::ExchangeStarted) => LinkState::Exchanging,
            (LinkState::Exchanging, LinkEvent::Exchanged(item_id)) => LinkState::Done { item_id },
            (state, event) => {
                return Err(TransitionError::Illegal {
                    state: state.name(),
                    event: event.name(),
                });
            }
        };
        debug!("link widget {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(&self.state)
    }

    /// Mount and request a link token for `user`.
    ///
    /// Relay failures are not returned; they move the widget to
    /// [`LinkState::Failed`] with a user-facing message.
    ///
    /// # Errors
    /// [`TransitionError`] if the widget is not idle.
    pub async fn load_token(
        &mut self,
        relay: &LinkTokenRelay,
        user: &Account,
    ) -> Result<&LinkState, TransitionError> {
        self.apply(LinkEvent::Mount)?;
        let event = match relay.create_link_token(user).await {
            Ok(token) => LinkEvent::TokenIssued(token),
            Err(err) => LinkEvent::TokenFailed(err.user_message()),
        };
        self.apply(event)
    }

    /// Take the public token from the hosted widget and exchange it.
    ///
    /// # Errors
    /// [`TransitionError`] if the widget is not open.
    pub async fn complete(
        &mut self,
        relay: &LinkTokenRelay,
        public_token: String,
        user: &Account,
    ) -> Result<&LinkState, TransitionError> {
        self.apply(LinkEvent::Success(public_token))?;
        // the relay outcome is already reflected in the state
        let _ = self.exchange(relay, user).await?;
        Ok(&self.state)
    }

    /// A widget whose hosted SDK already handed back `public_token`.
    ///
    /// The exchange endpoint picks the flow up here, after the browser posts
    /// the token.
    #[must_use]
    pub fn with_public_token(public_token: String) -> Self {
        Self {
            state: LinkState::Success { public_token },
            sdk_ready: true,
        }
    }

    /// Exchange the public token held in `success`.
    ///
    /// The widget ends in `done` or `failed`; the relay's own result is
    /// returned unchanged so callers keep the error kind.
    ///
    /// # Errors
    /// [`TransitionError`] if the widget holds no public token.
    pub async fn exchange(
        &mut self,
        relay: &LinkTokenRelay,
        user: &Account,
    ) -> Result<Result<LinkedItem, Error>, TransitionError> {
        let LinkState::Success { public_token } = &self.state else {
            return Err(TransitionError::Illegal {
                state: self.state.name(),
                event: LinkEvent::ExchangeStarted.name(),
            });
        };
        let public_token = public_token.clone();
        self.apply(LinkEvent::ExchangeStarted)?;
        let outcome = relay.exchange_public_token(&public_token, user).await;
        let event = match &outcome {
            Ok(item) => LinkEvent::Exchanged(item.item_id.clone()),
            Err(err) => LinkEvent::ExchangeFailed(err.user_message()),
        };
        self.apply(event)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregator::memory::MemoryAggregator, identity::memory::MemoryIdentity};
    use std::sync::Arc;

    fn token(value: &str) -> LinkToken {
        LinkToken {
            link_token: value.to_string(),
            expiration: None,
        }
    }

    fn account() -> Account {
        Account {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
        }
    }

    #[test]
    fn happy_path() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::Mount)?;
        widget.apply(LinkEvent::TokenIssued(token("link-1")))?;
        assert!(!widget.button_enabled());
        widget.apply(LinkEvent::SdkReady)?;
        assert!(widget.button_enabled());
        widget.apply(LinkEvent::Open)?;
        widget.apply(LinkEvent::Success("public-1".to_string()))?;
        widget.apply(LinkEvent::ExchangeStarted)?;
        let state = widget.apply(LinkEvent::Exchanged("item-1".to_string()))?;
        assert_eq!(
            state,
            &LinkState::Done {
                item_id: "item-1".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn open_requires_sdk_readiness() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::Mount)?;
        widget.apply(LinkEvent::TokenIssued(token("link-1")))?;
        assert_eq!(widget.apply(LinkEvent::Open), Err(TransitionError::SdkNotReady));
        assert_eq!(widget.state().name(), "token-ready");
        Ok(())
    }

    #[test]
    fn open_requires_token() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::SdkReady)?;
        widget.apply(LinkEvent::Mount)?;
        assert!(!widget.button_enabled());
        assert_eq!(
            widget.apply(LinkEvent::Open),
            Err(TransitionError::Illegal {
                state: "token-requested",
                event: "open"
            })
        );
        Ok(())
    }

    #[test]
    fn token_is_requested_once_per_mount() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::Mount)?;
        assert!(widget.apply(LinkEvent::Mount).is_err());
        assert_eq!(widget.state(), &LinkState::TokenRequested);
        Ok(())
    }

    #[test]
    fn exit_returns_to_idle() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::SdkReady)?;
        widget.apply(LinkEvent::Mount)?;
        widget.apply(LinkEvent::TokenIssued(token("link-1")))?;
        widget.apply(LinkEvent::Open)?;
        widget.apply(LinkEvent::Exit)?;
        assert_eq!(widget.state(), &LinkState::Idle);
        Ok(())
    }

    #[test]
    fn failures_can_be_retried() -> Result<(), TransitionError> {
        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::Mount)?;
        widget.apply(LinkEvent::TokenFailed("try later".to_string()))?;
        assert!(!widget.button_enabled());
        assert!(widget.apply(LinkEvent::Open).is_err());
        widget.apply(LinkEvent::Retry)?;
        widget.apply(LinkEvent::Mount)?;
        assert_eq!(widget.state(), &LinkState::TokenRequested);
        Ok(())
    }

    #[tokio::test]
    async fn drives_relay_end_to_end() -> anyhow::Result<()> {
        let aggregator = Arc::new(MemoryAggregator::new());
        let identity = Arc::new(MemoryIdentity::new());
        let relay = LinkTokenRelay::new(aggregator.clone(), identity.clone());
        let user = account();

        let mut widget = LinkWidget::new();
        let LinkState::TokenReady { token } = widget.load_token(&relay, &user).await?.clone()
        else {
            anyhow::bail!("expected a token");
        };
        widget.apply(LinkEvent::SdkReady)?;
        widget.apply(LinkEvent::Open)?;

        let public_token = aggregator.complete_link(&token.link_token).await?;
        let state = widget.complete(&relay, public_token, &user).await?;
        let LinkState::Done { item_id } = state else {
            anyhow::bail!("expected done, got {}", state.name());
        };
        assert_eq!(identity.items_for("u1").await, vec![item_id.clone()]);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_exchange_moves_to_failed() -> anyhow::Result<()> {
        let aggregator = Arc::new(MemoryAggregator::new());
        let identity = Arc::new(MemoryIdentity::new());
        let relay = LinkTokenRelay::new(aggregator, identity);
        let user = account();

        let mut widget = LinkWidget::new();
        widget.apply(LinkEvent::SdkReady)?;
        widget.load_token(&relay, &user).await?;
        widget.apply(LinkEvent::Open)?;
        let state = widget
            .complete(&relay, "public-forged".to_string(), &user)
            .await?;
        assert_eq!(state.name(), "failed");
        widget.apply(LinkEvent::Retry)?;
        assert_eq!(widget.state(), &LinkState::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn exchange_keeps_the_relay_error() -> anyhow::Result<()> {
        let aggregator = Arc::new(MemoryAggregator::new());
        let identity = Arc::new(MemoryIdentity::new());
        let relay = LinkTokenRelay::new(aggregator, identity);

        let mut widget = LinkWidget::with_public_token("public-forged".to_string());
        let outcome = widget.exchange(&relay, &account()).await?;
        assert!(matches!(outcome, Err(Error::TokenRejected(_))));
        assert_eq!(widget.state().name(), "failed");

        // nothing left to exchange
        assert!(widget.exchange(&relay, &account()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn exchange_requires_a_public_token() {
        let aggregator = Arc::new(MemoryAggregator::new());
        let identity = Arc::new(MemoryIdentity::new());
        let relay = LinkTokenRelay::new(aggregator, identity);

        let mut widget = LinkWidget::new();
        let result = widget.exchange(&relay, &account()).await;
        assert_eq!(
            result.err(),
            Some(TransitionError::Illegal {
                state: "idle",
                event: "exchange-started"
            })
        );
        assert_eq!(widget.state(), &LinkState::Idle);
    }
}
