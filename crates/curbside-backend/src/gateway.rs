//! Typed operations over the realtime database.
//!
//! The gateway is the only component that knows document paths and field
//! names. Sessions talk to it in terms of [`User`] and [`Trip`] records and
//! receive typed streams ([`IncomingTrip`], [`TripUpdate`], [`DriverUpdate`])
//! instead of raw snapshots.
//!
//! Every operation completes exactly once. Nothing is retried: a failed write
//! is returned to the caller, who decides whether to surface it.

use std::collections::HashSet;

use curbside_core::{Coordinate, Trip, TripEvent, TripState, User, transition};

use crate::{
    Subscription,
    database::{Change, ChangeKind, Collection, Database, DocPath, GeoEvent},
    error::GatewayError,
};

/// Default radius of the nearby-driver query: 50 km.
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 50_000.0;

/// Offers and withdrawals seen by drivers.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingTrip {
    /// An unclaimed trip (existing when observation started, or new)
    Requested(Trip),
    /// A previously offered trip was claimed by someone or deleted
    Withdrawn(String),
}

/// Changes to one trip record.
#[derive(Debug, Clone, PartialEq)]
pub enum TripUpdate {
    /// Record was created or changed
    Changed(Trip),
    /// Record was deleted
    Removed,
}

/// Changes to the set of drivers inside a query circle.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverUpdate {
    /// Driver came into range. `location` is set.
    Entered(User),
    /// Driver moved within range
    Moved {
        /// Driver uid
        uid: String,
        /// New position
        location: Coordinate,
    },
    /// Driver left range or went offline
    Exited {
        /// Driver uid
        uid: String,
    },
}

/// Typed façade over a [`Database`].
#[derive(Clone)]
pub struct Gateway<D: Database> {
    db: D,
}

impl<D: Database> Gateway<D> {
    /// Create a gateway over `db`.
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Underlying database.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// Fetch `users/{uid}`.
    ///
    /// A missing or malformed snapshot yields `Ok(None)`.
    pub fn fetch_user(&self, uid: &str) -> Result<Option<User>, GatewayError> {
        let Some(doc) = self.db.get(&DocPath::user(uid))? else {
            tracing::debug!(uid, "user not found");
            return Ok(None);
        };

        match User::from_document(uid, &doc) {
            Ok(user) => Ok(Some(user)),
            Err(error) => {
                tracing::debug!(uid, %error, "dropping malformed user snapshot");
                Ok(None)
            },
        }
    }

    /// Write `users/{uid}`, merging into any existing record.
    pub fn save_user(&self, user: &User) -> Result<(), GatewayError> {
        let fields = match user.to_document() {
            ciborium::Value::Map(entries) => entries
                .into_iter()
                .filter_map(|(k, v)| k.into_text().ok().map(|k| (k, v)))
                .collect(),
            _ => Vec::new(),
        };
        self.db.update(&DocPath::user(&user.uid), fields)?;
        tracing::debug!(uid = %user.uid, "user saved");
        Ok(())
    }

    /// Fetch `trips/{passengerUid}`.
    ///
    /// A missing or malformed snapshot yields `Ok(None)`.
    pub fn fetch_trip(&self, passenger_uid: &str) -> Result<Option<Trip>, GatewayError> {
        let Some(doc) = self.db.get(&DocPath::trip(passenger_uid))? else {
            return Ok(None);
        };

        match Trip::from_document(passenger_uid, &doc) {
            Ok(trip) => Ok(Some(trip)),
            Err(error) => {
                tracing::debug!(passenger_uid, %error, "dropping malformed trip snapshot");
                Ok(None)
            },
        }
    }

    /// Continuous query for drivers within `radius_m` of `center`.
    pub fn fetch_nearby_drivers(
        &self,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<NearbyDrivers<D>, GatewayError> {
        if !center.is_valid() {
            return Err(GatewayError::InvalidCoordinate(center));
        }

        let events = self.db.query_radius(center, radius_m, |event| Some(event.clone()))?;
        Ok(NearbyDrivers { events, gateway: self.clone() })
    }

    /// Create the passenger's trip request in state `requested`.
    ///
    /// A completed or malformed leftover record is overwritten.
    ///
    /// # Errors
    ///
    /// - `TripExists` if the passenger already has an active trip
    /// - `InvalidCoordinate` if either endpoint is out of range
    pub fn create_trip(
        &self,
        passenger_uid: &str,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<Trip, GatewayError> {
        for point in [pickup, destination] {
            if !point.is_valid() {
                return Err(GatewayError::InvalidCoordinate(point));
            }
        }

        let trip = Trip::request(passenger_uid, pickup, destination);
        let doc = trip.to_document()?;

        self.db.transact(&DocPath::trip(passenger_uid), |current| {
            let active = current
                .and_then(|doc| Trip::from_document(passenger_uid, doc).ok())
                .is_some_and(|existing| existing.state.is_active());
            if active {
                return Err(GatewayError::TripExists { passenger_uid: passenger_uid.to_owned() });
            }
            Ok(doc)
        })?;

        tracing::info!(passenger_uid, %pickup, %destination, "trip requested");
        Ok(trip)
    }

    /// Move the trip from `from` to `to` if it is still in `from`.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if no lifecycle event moves `from` to `to`
    /// - `TripNotFound` if the record is gone
    /// - `Conflict` if the stored state is not `from`
    pub fn update_trip_state(
        &self,
        passenger_uid: &str,
        from: TripState,
        to: TripState,
    ) -> Result<Trip, GatewayError> {
        if TripEvent::between(from, to).is_none() {
            return Err(GatewayError::InvalidTransition { from, to });
        }

        let mut updated = None;
        self.db.transact(&DocPath::trip(passenger_uid), |current| {
            let mut trip = self.stored_trip(passenger_uid, current)?;
            if trip.state != from {
                return Err(GatewayError::Conflict { expected: from, actual: trip.state });
            }
            trip.state = to;
            let doc = trip.to_document()?;
            updated = Some(trip);
            Ok(doc)
        })?;

        tracing::info!(passenger_uid, ?from, ?to, "trip state updated");
        updated.ok_or(GatewayError::TripNotFound { passenger_uid: passenger_uid.to_owned() })
    }

    /// Delete the passenger's trip. Deleting a missing trip succeeds.
    pub fn delete_trip(&self, passenger_uid: &str) -> Result<(), GatewayError> {
        if self.db.remove(&DocPath::trip(passenger_uid))? {
            tracing::info!(passenger_uid, "trip deleted");
        }
        Ok(())
    }

    /// Claim `trip` for `driver_uid`.
    ///
    /// Sets `driverUid` and moves the trip to `accepted` in one atomic write.
    ///
    /// # Errors
    ///
    /// - `TripNotFound` if the record is gone
    /// - `AlreadyClaimed` if a driver is attached
    /// - `Conflict` if the trip is unclaimed but no longer `requested`
    pub fn accept_trip(&self, trip: &Trip, driver_uid: &str) -> Result<Trip, GatewayError> {
        let passenger_uid = trip.passenger_uid.as_str();

        let mut claimed = None;
        self.db.transact(&DocPath::trip(passenger_uid), |current| {
            let mut stored = self.stored_trip(passenger_uid, current)?;
            if let Some(winner) = stored.driver_uid {
                return Err(GatewayError::AlreadyClaimed {
                    passenger_uid: passenger_uid.to_owned(),
                    driver_uid: winner,
                });
            }
            stored.state = transition(stored.state, TripEvent::Accept).map_err(|e| {
                GatewayError::Conflict { expected: TripState::Requested, actual: e.state }
            })?;
            stored.driver_uid = Some(driver_uid.to_owned());

            let doc = stored.to_document()?;
            claimed = Some(stored);
            Ok(doc)
        })?;

        tracing::info!(passenger_uid, driver_uid, "trip accepted");
        claimed.ok_or(GatewayError::TripNotFound { passenger_uid: passenger_uid.to_owned() })
    }

    /// Set the driver's position in the location index.
    pub fn push_driver_location(&self, uid: &str, location: Coordinate) -> Result<(), GatewayError> {
        if !location.is_valid() {
            return Err(GatewayError::InvalidCoordinate(location));
        }
        self.db.set_location(uid, location)?;
        tracing::trace!(uid, %location, "driver location pushed");
        Ok(())
    }

    /// Remove the driver from the location index.
    pub fn remove_driver_location(&self, uid: &str) -> Result<(), GatewayError> {
        self.db.remove_location(uid)?;
        Ok(())
    }

    /// Unclaimed trips, existing and new, plus withdrawals of offered ones.
    pub fn observe_incoming_trips(&self) -> Result<Subscription<IncomingTrip>, GatewayError> {
        let mut offered: HashSet<String> = HashSet::new();

        let sub = self.db.watch(Collection::Trips, move |change: &Change| {
            if change.kind == ChangeKind::Removed {
                return offered.remove(&change.key).then(|| IncomingTrip::Withdrawn(change.key.clone()));
            }

            let trip = match Trip::from_document(change.key.as_str(), &change.document) {
                Ok(trip) => trip,
                Err(error) => {
                    tracing::debug!(key = %change.key, %error, "dropping malformed trip snapshot");
                    return None;
                },
            };

            if trip.is_unclaimed() && trip.state == TripState::Requested {
                offered.insert(change.key.clone());
                Some(IncomingTrip::Requested(trip))
            } else {
                offered.remove(&change.key).then(|| IncomingTrip::Withdrawn(change.key.clone()))
            }
        })?;

        Ok(sub)
    }

    /// Changes to one trip record.
    pub fn observe_trip(&self, passenger_uid: &str) -> Result<Subscription<TripUpdate>, GatewayError> {
        let key = passenger_uid.to_owned();

        let sub = self.db.watch(Collection::Trips, move |change: &Change| {
            if change.key != key {
                return None;
            }
            if change.kind == ChangeKind::Removed {
                return Some(TripUpdate::Removed);
            }
            match Trip::from_document(key.as_str(), &change.document) {
                Ok(trip) => Some(TripUpdate::Changed(trip)),
                Err(error) => {
                    tracing::debug!(%key, %error, "dropping malformed trip snapshot");
                    None
                },
            }
        })?;

        Ok(sub)
    }

    /// Fires once when the passenger's trip record is deleted.
    pub fn observe_trip_cancelled(&self, passenger_uid: &str) -> Result<Subscription<()>, GatewayError> {
        let key = passenger_uid.to_owned();
        let mut fired = false;

        let sub = self.db.watch(Collection::Trips, move |change: &Change| {
            if fired || change.key != key || change.kind != ChangeKind::Removed {
                return None;
            }
            fired = true;
            Some(())
        })?;

        Ok(sub)
    }

    fn stored_trip(
        &self,
        passenger_uid: &str,
        current: Option<&curbside_core::Document>,
    ) -> Result<Trip, GatewayError> {
        let doc =
            current.ok_or(GatewayError::TripNotFound { passenger_uid: passenger_uid.to_owned() })?;
        Ok(Trip::from_document(passenger_uid, doc)?)
    }
}

/// Live nearby-driver query.
///
/// Entered keys are resolved to driver records; keys that cannot be resolved
/// or are not drivers are skipped.
pub struct NearbyDrivers<D: Database> {
    events: Subscription<GeoEvent>,
    gateway: Gateway<D>,
}

impl<D: Database> NearbyDrivers<D> {
    /// Next update if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<DriverUpdate> {
        loop {
            let event = self.events.try_next()?;
            if let Some(update) = self.resolve(event) {
                return Some(update);
            }
        }
    }

    /// Wait for the next update.
    pub async fn next(&mut self) -> Option<DriverUpdate> {
        loop {
            let event = self.events.next().await?;
            if let Some(update) = self.resolve(event) {
                return Some(update);
            }
        }
    }

    /// All updates that are ready now.
    pub fn drain(&mut self) -> Vec<DriverUpdate> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stop the query.
    pub fn cancel(self) {
        self.events.cancel();
    }

    fn resolve(&self, event: GeoEvent) -> Option<DriverUpdate> {
        match event {
            GeoEvent::Entered { key, location } => match self.gateway.fetch_user(&key) {
                Ok(Some(mut user)) if user.is_driver() => {
                    user.location = Some(location);
                    Some(DriverUpdate::Entered(user))
                },
                Ok(_) => {
                    tracing::debug!(%key, "skipping unresolvable driver");
                    None
                },
                Err(error) => {
                    tracing::warn!(%key, %error, "failed to fetch nearby driver");
                    None
                },
            },
            GeoEvent::Moved { key, location } => Some(DriverUpdate::Moved { uid: key, location }),
            GeoEvent::Exited { key } => Some(DriverUpdate::Exited { uid: key }),
        }
    }
}
