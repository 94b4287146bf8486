//! Backend-to-session translation layer.
//!
//! The [`Bridge`] wraps the [`Gateway`] and adapts it to the session
//! lifecycle.
//!
//! # Responsibilities
//!
//! - Executes backend [`crate::SessionAction`]s for the signed-in user.
//! - Owns every subscription a session asked for, and drops them when the
//!   session stops observing or signs out.
//! - Converts operation results and subscription items back into
//!   [`crate::SessionEvent`]s.
//!
//! Write failures are logged and reported as [`SessionEvent::Error`]. Nothing
//! is retried or rolled back.

use curbside_backend::{
    Database, Gateway, GatewayError, IncomingTrip, NearbyDrivers, Subscription, TripUpdate,
};

use crate::{Observation, SessionAction, SessionEvent};

/// Bridge between a session and the gateway.
pub struct Bridge<D: Database> {
    gateway: Gateway<D>,
    uid: String,
    own_trip: Option<Subscription<TripUpdate>>,
    nearby: Option<NearbyDrivers<D>>,
    incoming: Option<Subscription<IncomingTrip>>,
    cancellation: Option<Subscription<()>>,
}

impl<D: Database> Bridge<D> {
    /// Create a bridge acting as `uid`.
    pub fn new(gateway: Gateway<D>, uid: impl Into<String>) -> Self {
        Self {
            gateway,
            uid: uid.into(),
            own_trip: None,
            nearby: None,
            incoming: None,
            cancellation: None,
        }
    }

    /// Uid the bridge acts as.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Underlying gateway.
    pub fn gateway(&self) -> &Gateway<D> {
        &self.gateway
    }

    /// Bridge holds a live subscription for `observation`.
    pub fn is_observing(&self, observation: Observation) -> bool {
        match observation {
            Observation::OwnTrip => self.own_trip.is_some(),
            Observation::NearbyDrivers => self.nearby.is_some(),
            Observation::IncomingTrips => self.incoming.is_some(),
            Observation::Cancellation => self.cancellation.is_some(),
        }
    }

    /// Execute a session action and return resulting session events.
    ///
    /// Device actions (render, routes, overlays) produce nothing here.
    pub fn process_action(&mut self, action: SessionAction) -> Vec<SessionEvent> {
        match action {
            SessionAction::ObserveTrip { passenger_uid } => {
                let result = self.gateway.observe_trip(&passenger_uid);
                self.subscribe(result, |bridge, sub| bridge.own_trip = Some(sub))
            },
            SessionAction::ObserveNearbyDrivers { center, radius_m } => {
                let result = self.gateway.fetch_nearby_drivers(center, radius_m);
                self.subscribe(result, |bridge, sub| bridge.nearby = Some(sub))
            },
            SessionAction::ObserveIncomingTrips => {
                let result = self.gateway.observe_incoming_trips();
                self.subscribe(result, |bridge, sub| bridge.incoming = Some(sub))
            },
            SessionAction::ObserveCancellation { passenger_uid } => {
                let result = self.gateway.observe_trip_cancelled(&passenger_uid);
                self.subscribe(result, |bridge, sub| bridge.cancellation = Some(sub))
            },
            SessionAction::StopObserving(observation) => {
                self.stop(observation);
                vec![]
            },
            SessionAction::CreateTrip { pickup, destination } => {
                let result = self.gateway.create_trip(&self.uid, pickup, destination);
                Self::reply(result, "create trip", |trip| Some(SessionEvent::TripCreated(trip)))
            },
            SessionAction::ClaimTrip(trip) => {
                let result = self.gateway.accept_trip(&trip, &self.uid);
                Self::reply(result, "accept trip", |trip| Some(SessionEvent::TripClaimed(trip)))
            },
            SessionAction::AdvanceTrip { passenger_uid, from, to } => {
                let result = self.gateway.update_trip_state(&passenger_uid, from, to);
                Self::reply(result, "update trip state", |trip| {
                    Some(SessionEvent::TripAdvanced(trip))
                })
            },
            SessionAction::DeleteTrip { passenger_uid } => {
                let result = self.gateway.delete_trip(&passenger_uid);
                Self::reply(result, "delete trip", |()| None)
            },
            SessionAction::PushLocation(location) => {
                if let Err(error) = self.gateway.push_driver_location(&self.uid, location) {
                    tracing::warn!(uid = %self.uid, %error, "failed to push driver location");
                }
                vec![]
            },
            SessionAction::FetchUser { uid } => match self.gateway.fetch_user(&uid) {
                Ok(Some(user)) => vec![SessionEvent::UserFetched(user)],
                Ok(None) => vec![],
                Err(error) => {
                    tracing::warn!(%uid, %error, "failed to fetch user");
                    vec![]
                },
            },
            SessionAction::Render | SessionAction::ShowRoute { .. } | SessionAction::ClearOverlays => {
                vec![]
            },
        }
    }

    /// Drain every subscription and return the resulting session events.
    pub fn poll_subscriptions(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(sub) = &mut self.own_trip {
            events.extend(sub.drain().into_iter().map(|update| match update {
                TripUpdate::Changed(trip) => SessionEvent::TripChanged(trip),
                TripUpdate::Removed => SessionEvent::TripRemoved,
            }));
        }
        if let Some(sub) = &mut self.nearby {
            events.extend(sub.drain().into_iter().map(SessionEvent::Driver));
        }
        if let Some(sub) = &mut self.incoming {
            events.extend(sub.drain().into_iter().map(SessionEvent::Incoming));
        }
        if let Some(sub) = &mut self.cancellation {
            events.extend(sub.drain().into_iter().map(|()| SessionEvent::TripCancelled));
        }

        events
    }

    /// Drop every subscription.
    pub fn release(&mut self) {
        for observation in [
            Observation::OwnTrip,
            Observation::NearbyDrivers,
            Observation::IncomingTrips,
            Observation::Cancellation,
        ] {
            self.stop(observation);
        }
    }

    fn stop(&mut self, observation: Observation) {
        match observation {
            Observation::OwnTrip => drop(self.own_trip.take()),
            Observation::NearbyDrivers => drop(self.nearby.take()),
            Observation::IncomingTrips => drop(self.incoming.take()),
            Observation::Cancellation => drop(self.cancellation.take()),
        }
        tracing::trace!(uid = %self.uid, ?observation, "observation stopped");
    }

    fn subscribe<S>(
        &mut self,
        result: Result<S, GatewayError>,
        store: impl FnOnce(&mut Self, S),
    ) -> Vec<SessionEvent> {
        match result {
            Ok(sub) => {
                store(self, sub);
                vec![]
            },
            Err(error) => {
                tracing::warn!(uid = %self.uid, %error, "failed to subscribe");
                vec![SessionEvent::Error { message: error.to_string() }]
            },
        }
    }

    fn reply<T>(
        result: Result<T, GatewayError>,
        operation: &str,
        on_success: impl FnOnce(T) -> Option<SessionEvent>,
    ) -> Vec<SessionEvent> {
        match result {
            Ok(value) => on_success(value).into_iter().collect(),
            Err(error) => {
                tracing::warn!(operation, %error, "backend operation failed");
                vec![SessionEvent::Error { message: error.to_string() }]
            },
        }
    }
}
