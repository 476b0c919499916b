//! Standard event names
//!
//! The set is fixed at compile time. Producers may still send arbitrary names
//! through `RawEvent::event`; this table only covers the names the emitter and
//! downstream dashboards agree on.

use std::str::FromStr;

use crate::error::ProtocolError;

/// Standard event names shared by the primary store and secondary APIs
///
/// NOTE: The wire strings are queried by dashboards and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    // Page/screen
    /// `$pageview`
    PageView,
    /// `$screen`
    ScreenView,

    // Identification
    /// `$identify`
    Identify,
    /// `$groupidentify`
    GroupIdentify,
    /// `$create_alias`
    Alias,

    // Commerce
    /// `product_viewed`
    ProductViewed,
    /// `product_added`
    ProductAdded,
    /// `product_removed`
    ProductRemoved,
    /// `cart_viewed`
    CartViewed,
    /// `checkout_started`
    CheckoutStarted,
    /// `checkout_step`
    CheckoutStep,
    /// `order_completed`
    OrderCompleted,
    /// `order_refunded`
    OrderRefunded,

    // User lifecycle
    /// `signed_up`
    SignedUp,
    /// `signed_in`
    SignedIn,
    /// `signed_out`
    SignedOut,

    // Engagement
    /// `feature_used`
    FeatureUsed,
    /// `button_clicked`
    ButtonClick,
    /// `form_submitted`
    FormSubmit,
    /// `search_query`
    SearchQuery,

    // Page structure / UI interaction
    /// `section_viewed`
    SectionViewed,
    /// `element_interaction`
    ElementInteraction,
    /// `link_clicked`
    LinkClicked,
    /// `input_changed`
    InputChanged,
    /// `scroll_depth`
    ScrollDepth,
    /// `visibility_change`
    VisibilityChange,

    // AI usage
    /// `ai.message.created`
    AiMessageCreated,
    /// `ai.chat.started`
    AiChatStarted,
    /// `ai.completion`
    AiCompletion,
    /// `ai.tokens.consumed`
    AiTokensConsumed,
    /// `ai.model.invoked`
    AiModelInvoked,
    /// `ai.error`
    AiError,

    // Tracking pixels / API
    /// `pixel_view`
    PixelView,
    /// `$api_request`
    ApiRequest,
    /// `$exception`
    Exception,
}

impl EventName {
    /// Every standard event name, in declaration order
    pub const ALL: [Self; 35] = [
        Self::PageView,
        Self::ScreenView,
        Self::Identify,
        Self::GroupIdentify,
        Self::Alias,
        Self::ProductViewed,
        Self::ProductAdded,
        Self::ProductRemoved,
        Self::CartViewed,
        Self::CheckoutStarted,
        Self::CheckoutStep,
        Self::OrderCompleted,
        Self::OrderRefunded,
        Self::SignedUp,
        Self::SignedIn,
        Self::SignedOut,
        Self::FeatureUsed,
        Self::ButtonClick,
        Self::FormSubmit,
        Self::SearchQuery,
        Self::SectionViewed,
        Self::ElementInteraction,
        Self::LinkClicked,
        Self::InputChanged,
        Self::ScrollDepth,
        Self::VisibilityChange,
        Self::AiMessageCreated,
        Self::AiChatStarted,
        Self::AiCompletion,
        Self::AiTokensConsumed,
        Self::AiModelInvoked,
        Self::AiError,
        Self::PixelView,
        Self::ApiRequest,
        Self::Exception,
    ];

    /// Get the wire string for this event name
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "$pageview",
            Self::ScreenView => "$screen",
            Self::Identify => "$identify",
            Self::GroupIdentify => "$groupidentify",
            Self::Alias => "$create_alias",
            Self::ProductViewed => "product_viewed",
            Self::ProductAdded => "product_added",
            Self::ProductRemoved => "product_removed",
            Self::CartViewed => "cart_viewed",
            Self::CheckoutStarted => "checkout_started",
            Self::CheckoutStep => "checkout_step",
            Self::OrderCompleted => "order_completed",
            Self::OrderRefunded => "order_refunded",
            Self::SignedUp => "signed_up",
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::FeatureUsed => "feature_used",
            Self::ButtonClick => "button_clicked",
            Self::FormSubmit => "form_submitted",
            Self::SearchQuery => "search_query",
            Self::SectionViewed => "section_viewed",
            Self::ElementInteraction => "element_interaction",
            Self::LinkClicked => "link_clicked",
            Self::InputChanged => "input_changed",
            Self::ScrollDepth => "scroll_depth",
            Self::VisibilityChange => "visibility_change",
            Self::AiMessageCreated => "ai.message.created",
            Self::AiChatStarted => "ai.chat.started",
            Self::AiCompletion => "ai.completion",
            Self::AiTokensConsumed => "ai.tokens.consumed",
            Self::AiModelInvoked => "ai.model.invoked",
            Self::AiError => "ai.error",
            Self::PixelView => "pixel_view",
            Self::ApiRequest => "$api_request",
            Self::Exception => "$exception",
        }
    }

    /// Check if this is a commerce event (carries order or product fields)
    #[inline]
    pub const fn is_commerce(self) -> bool {
        matches!(
            self,
            Self::ProductViewed
                | Self::ProductAdded
                | Self::ProductRemoved
                | Self::CartViewed
                | Self::CheckoutStarted
                | Self::CheckoutStep
                | Self::OrderCompleted
                | Self::OrderRefunded
        )
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownEventName(s.to_string()))
    }
}

impl From<EventName> for String {
    fn from(name: EventName) -> Self {
        name.as_str().to_string()
    }
}
