//! Trip records.
//!
//! A trip lives under `trips/{passengerUid}`; the passenger's uid is the key,
//! not a stored field, so one passenger has at most one trip at a time.

use serde::{Deserialize, Serialize};

use crate::{
    Coordinate, DocumentError,
    document::{self, Document},
};

/// Lifecycle state of a trip.
///
/// The integer encoding is fixed and shared by both client roles. Cancellation
/// is not a state: a cancelled trip is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TripState {
    /// Waiting for a driver to claim it.
    Requested,
    /// Claimed; the driver is on the way to pickup.
    Accepted,
    /// Driver is inside the pickup geofence.
    DriverArrived,
    /// Passenger picked up, heading to destination.
    InProgress,
    /// Driver is inside the destination geofence.
    ArrivedAtDestination,
    /// Drop-off confirmed. The passenger deletes the record.
    Completed,
}

impl TripState {
    /// All states in lifecycle order.
    pub const ALL: [TripState; 6] = [
        Self::Requested,
        Self::Accepted,
        Self::DriverArrived,
        Self::InProgress,
        Self::ArrivedAtDestination,
        Self::Completed,
    ];

    /// Trip has not been completed.
    pub fn is_active(self) -> bool {
        self != Self::Completed
    }
}

impl From<TripState> for u8 {
    fn from(state: TripState) -> Self {
        match state {
            TripState::Requested => 0,
            TripState::Accepted => 1,
            TripState::DriverArrived => 2,
            TripState::InProgress => 3,
            TripState::ArrivedAtDestination => 4,
            TripState::Completed => 5,
        }
    }
}

impl TryFrom<u8> for TripState {
    type Error = DocumentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(value)).copied().ok_or(DocumentError::UnknownState(value))
    }
}

const REQUIRED_FIELDS: [&str; 3] = ["pickupCoordinates", "destinationCoordinates", "state"];

/// Stored shape of `trips/{passengerUid}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripDocument {
    pickup_coordinates: Coordinate,
    destination_coordinates: Coordinate,
    state: TripState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    driver_uid: Option<String>,
}

/// A ride request shared by its passenger and (once claimed) its driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// Owner and document key.
    pub passenger_uid: String,
    /// Claiming driver. `None` until accepted.
    pub driver_uid: Option<String>,
    /// Where the passenger is picked up.
    pub pickup: Coordinate,
    /// Where the passenger is dropped off.
    pub destination: Coordinate,
    /// Current lifecycle state.
    pub state: TripState,
}

impl Trip {
    /// A new, unclaimed trip request.
    pub fn request(
        passenger_uid: impl Into<String>,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Self {
        Self {
            passenger_uid: passenger_uid.into(),
            driver_uid: None,
            pickup,
            destination,
            state: TripState::Requested,
        }
    }

    /// No driver has claimed this trip.
    pub fn is_unclaimed(&self) -> bool {
        self.driver_uid.is_none()
    }

    /// Decode a `trips/{passengerUid}` snapshot.
    pub fn from_document(
        passenger_uid: impl Into<String>,
        doc: &Document,
    ) -> Result<Self, DocumentError> {
        if !doc.is_map() {
            return Err(DocumentError::NotAMap);
        }
        for name in REQUIRED_FIELDS {
            if document::field(doc, name).is_none() {
                return Err(DocumentError::MissingField(name));
            }
        }

        let stored: TripDocument = document::decode(doc)?;
        Ok(Self {
            passenger_uid: passenger_uid.into(),
            driver_uid: stored.driver_uid,
            pickup: stored.pickup_coordinates,
            destination: stored.destination_coordinates,
            state: stored.state,
        })
    }

    /// Encode as a `trips/{passengerUid}` document.
    pub fn to_document(&self) -> Result<Document, DocumentError> {
        document::encode(&TripDocument {
            pickup_coordinates: self.pickup,
            destination_coordinates: self.destination,
            state: self.state,
            driver_uid: self.driver_uid.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use super::*;

    #[test]
    fn state_encoding_is_fixed() {
        let encoded: Vec<u8> = TripState::ALL.iter().map(|s| u8::from(*s)).collect();
        assert_eq!(encoded, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(TripState::try_from(6), Err(DocumentError::UnknownState(6)));
    }

    #[test]
    fn document_layout() {
        let trip =
            Trip::request("p1", Coordinate::new(37.0, -122.0), Coordinate::new(37.1, -122.1));
        let doc = trip.to_document().expect("encode");

        assert_eq!(document::int_field(&doc, "state"), Some(0));
        assert!(document::field(&doc, "driverUid").is_none());

        let pickup = document::field(&doc, "pickupCoordinates").and_then(Value::as_array);
        assert_eq!(pickup.map(Vec::len), Some(2));
    }

    #[test]
    fn decode_claimed_trip() {
        let mut trip =
            Trip::request("p1", Coordinate::new(37.0, -122.0), Coordinate::new(37.1, -122.1));
        trip.driver_uid = Some("d1".into());
        trip.state = TripState::Accepted;

        let doc = trip.to_document().expect("encode");
        assert_eq!(Trip::from_document("p1", &doc), Ok(trip));
    }

    #[test]
    fn decode_rejects_unknown_state() {
        let doc = document::map([
            ("pickupCoordinates", Value::Array(vec![Value::Float(1.0), Value::Float(2.0)])),
            ("destinationCoordinates", Value::Array(vec![Value::Float(3.0), Value::Float(4.0)])),
            ("state", Value::Integer(9u8.into())),
        ]);
        assert!(Trip::from_document("p1", &doc).is_err());
    }

    #[test]
    fn decode_rejects_missing_coordinates() {
        let doc = document::map([("state", Value::Integer(0u8.into()))]);
        assert_eq!(
            Trip::from_document("p1", &doc),
            Err(DocumentError::MissingField("pickupCoordinates"))
        );
    }

    #[test]
    fn decode_rejects_missing_state() {
        let doc = document::map([
            ("pickupCoordinates", Value::Array(vec![Value::Float(1.0), Value::Float(2.0)])),
            ("destinationCoordinates", Value::Array(vec![Value::Float(3.0), Value::Float(4.0)])),
        ]);
        assert_eq!(Trip::from_document("p1", &doc), Err(DocumentError::MissingField("state")));
    }

    #[test]
    fn decode_rejects_out_of_range_coordinates() {
        let doc = |pickup: [f64; 2]| {
            document::map([
                (
                    "pickupCoordinates",
                    Value::Array(pickup.iter().map(|v| Value::Float(*v)).collect()),
                ),
                ("destinationCoordinates", Value::Array(vec![Value::Float(3.0), Value::Float(4.0)])),
                ("state", Value::Integer(0u8.into())),
            ])
        };

        for pickup in [[f64::NAN, 500.0], [91.0, 0.0], [0.0, -180.5], [f64::INFINITY, 0.0]] {
            assert!(
                matches!(Trip::from_document("p1", &doc(pickup)), Err(DocumentError::Codec(_))),
                "{pickup:?} accepted"
            );
        }
        assert!(Trip::from_document("p1", &doc([90.0, -180.0])).is_ok());
    }

    #[test]
    fn non_map_snapshot_is_rejected() {
        assert_eq!(Trip::from_document("p1", &Value::Null), Err(DocumentError::NotAMap));
    }
}
