//! Ride panel configuration.
//!
//! The panel is the bottom sheet both roles see during a ride: a title, an
//! optional detail line, the counterpart's name and a single action button.
//! This module only decides WHAT the panel says for a given viewer and trip
//! state; frontends decide how to draw it.

use crate::{AccountType, TripState};

/// Which panel layout is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelConfig {
    /// Passenger picked a destination and can confirm.
    RequestRide,
    /// Passenger waits for a driver to claim the request.
    Searching,
    /// Driver is offered an unclaimed trip.
    PickupRequest,
    /// Trip claimed; driver heading to pickup.
    TripAccepted,
    /// Passenger side: the driver reached pickup.
    DriverArrived,
    /// Driver side: the driver reached pickup.
    PickupPassenger,
    /// Passenger on board.
    TripInProgress,
    /// Driver reached the destination.
    EndTrip,
}

/// The panel button's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Create the trip request.
    RequestRide,
    /// Delete the trip.
    Cancel,
    /// Open turn-by-turn directions.
    GetDirections,
    /// Claim the offered trip.
    AcceptTrip,
    /// Start the trip with the passenger on board.
    Pickup,
    /// Confirm drop-off.
    DropOff,
}

impl std::fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RequestRide => "CONFIRM RIDE",
            Self::Cancel => "CANCEL RIDE",
            Self::GetDirections => "GET DIRECTIONS",
            Self::AcceptTrip => "ACCEPT TRIP",
            Self::Pickup => "PICKUP PASSENGER",
            Self::DropOff => "DROP OFF PASSENGER",
        };
        f.write_str(label)
    }
}

/// Rendered panel contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RidePanel {
    /// Layout.
    pub config: PanelConfig,
    /// Headline.
    pub title: String,
    /// Secondary line. `None` if the layout has none.
    pub detail: Option<String>,
    /// Counterpart's display name. `None` until fetched.
    pub counterpart: Option<String>,
    /// Button action. `None` for a status-only button.
    pub action: Option<ButtonAction>,
    /// Button text.
    pub button_label: String,
    /// Button accepts taps.
    pub button_enabled: bool,
}

impl RidePanel {
    fn new(config: PanelConfig, title: &str, action: ButtonAction) -> Self {
        Self {
            config,
            title: title.to_owned(),
            detail: None,
            counterpart: None,
            action: Some(action),
            button_label: action.to_string(),
            button_enabled: true,
        }
    }

    fn status_only(config: PanelConfig, title: &str, label: &str) -> Self {
        Self {
            config,
            title: title.to_owned(),
            detail: None,
            counterpart: None,
            action: None,
            button_label: label.to_owned(),
            button_enabled: false,
        }
    }

    fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_owned());
        self
    }

    /// Panel for a passenger who selected a destination.
    pub fn request_ride() -> Self {
        Self::new(PanelConfig::RequestRide, "Confirm your ride", ButtonAction::RequestRide)
    }

    /// Panel for `viewer` while the trip is in `state`. `None` once completed.
    pub fn for_trip(viewer: AccountType, state: TripState) -> Option<Self> {
        use AccountType::{Driver, Passenger};

        let panel = match (viewer, state) {
            (_, TripState::Completed) => return None,
            (Passenger, TripState::Requested) => {
                Self::new(PanelConfig::Searching, "Finding your driver", ButtonAction::Cancel)
            },
            (Driver, TripState::Requested) => Self::new(
                PanelConfig::PickupRequest,
                "Would you like to pickup this passenger",
                ButtonAction::AcceptTrip,
            ),
            (Passenger, TripState::Accepted) => {
                Self::new(PanelConfig::TripAccepted, "Driver En Route", ButtonAction::Cancel)
            },
            (Driver, TripState::Accepted) => Self::new(
                PanelConfig::TripAccepted,
                "En Route to Passenger",
                ButtonAction::GetDirections,
            ),
            (Passenger, TripState::DriverArrived) => {
                Self::new(PanelConfig::DriverArrived, "Driver has arrived", ButtonAction::Cancel)
                    .with_detail("Please meet driver at pickup location")
            },
            (Driver, TripState::DriverArrived) => Self::new(
                PanelConfig::PickupPassenger,
                "Arrived at Passenger Location",
                ButtonAction::Pickup,
            ),
            (Passenger, TripState::InProgress) => Self::status_only(
                PanelConfig::TripInProgress,
                "En Route to Destination",
                "TRIP IN PROGRESS",
            ),
            (Driver, TripState::InProgress) => Self::new(
                PanelConfig::TripInProgress,
                "En Route to Destination",
                ButtonAction::GetDirections,
            ),
            (Passenger, TripState::ArrivedAtDestination) => Self::status_only(
                PanelConfig::EndTrip,
                "Arrived at destination",
                "ARRIVED AT DESTINATION",
            ),
            (Driver, TripState::ArrivedAtDestination) => {
                Self::new(PanelConfig::EndTrip, "Arrived at destination", ButtonAction::DropOff)
            },
        };

        Some(panel)
    }

    /// Attach the counterpart's name.
    #[must_use]
    pub fn with_counterpart(mut self, name: impl Into<String>) -> Self {
        self.counterpart = Some(name.into());
        self
    }
}

impl std::fmt::Display for RidePanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(detail) = &self.detail {
            write!(f, " / {detail}")?;
        }
        let state = if self.button_enabled { "" } else { " (disabled)" };
        write!(f, " [{}{state}]", self.button_label)
    }
}
