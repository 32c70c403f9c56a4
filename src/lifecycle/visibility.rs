//! Contact visibility filter.
//!
//! Phone numbers are only revealed between two users joined by an
//! ACCEPTED invite. Everywhere else the number is replaced with a fixed
//! mask before the response is serialized, so the real value never
//! leaves the process for an unentitled viewer.

use crate::db::{InviteStatus, InvitesResponse, PublicUser, SuggestedRide};

/// Placeholder shown in place of a hidden phone number
pub const MASKED_PHONE: &str = "+91 9xxxx xxxxx";

/// Mask a user's phone number in place
pub fn mask_user(user: &mut PublicUser) {
    user.phone_number = MASKED_PHONE.to_string();
}

/// Apply the filter to an invites listing.
///
/// Sent invites expose the ride owner's number only once the invite is
/// ACCEPTED; received invites expose the sender's number under the same
/// rule. Declined and pending invites always carry the mask.
pub fn filter_invites(response: &mut InvitesResponse) {
    for sent in &mut response.sent {
        let accepted = sent.status.parse() == Ok(InviteStatus::Accepted);
        if !accepted {
            mask_user(&mut sent.ride.owner);
        }
    }

    for ride in &mut response.received {
        for invite in &mut ride.invites {
            let accepted = invite.status.parse() == Ok(InviteStatus::Accepted);
            if !accepted {
                mask_user(&mut invite.sender);
            }
        }
    }
}

/// Apply the filter to ride suggestions. A suggestion is always a ride
/// the viewer has not joined, so every participant number is masked.
pub fn filter_suggestions(suggestions: &mut [SuggestedRide]) {
    // Suggestions never expose numbers at all; participant_ids carry
    // membership without contact details. Nothing to mask today, but the
    // filter stays on the response path so new fields go through it.
    let _ = suggestions;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InvitedRide, ReceivedInvite, RideInvites, SentInvite};

    fn public_user(id: &str, phone: &str) -> PublicUser {
        PublicUser {
            id: id.to_string(),
            name: format!("user-{}", id),
            phone_number: phone.to_string(),
        }
    }

    fn sent_invite(status: &str, owner_phone: &str) -> SentInvite {
        SentInvite {
            id: "inv-1".to_string(),
            status: status.to_string(),
            decline_reason: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            ride: InvitedRide {
                id: "ride-1".to_string(),
                status: "PENDING".to_string(),
                people_count: 2,
                vehicle_type: "CAR".to_string(),
                prefers_gender: None,
                earliest_departure: "2026-01-01T08:00:00Z".to_string(),
                latest_departure: "2026-01-01T09:00:00Z".to_string(),
                owner: public_user("owner", owner_phone),
                stops: vec![],
                participants: vec![],
            },
        }
    }

    fn received_invite(status: &str, sender_phone: &str) -> ReceivedInvite {
        ReceivedInvite {
            id: "inv-2".to_string(),
            status: status.to_string(),
            decline_reason: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            sender: public_user("sender", sender_phone),
        }
    }

    #[test]
    fn test_pending_invites_are_masked() {
        let mut response = InvitesResponse {
            sent: vec![sent_invite("PENDING", "+919876543210")],
            received: vec![],
        };
        filter_invites(&mut response);
        assert_eq!(response.sent[0].ride.owner.phone_number, MASKED_PHONE);
    }

    #[test]
    fn test_accepted_invites_reveal_numbers() {
        let mut response = InvitesResponse {
            sent: vec![sent_invite("ACCEPTED", "+919876543210")],
            received: vec![],
        };
        filter_invites(&mut response);
        assert_eq!(response.sent[0].ride.owner.phone_number, "+919876543210");
    }

    #[test]
    fn test_declined_invites_stay_masked() {
        let mut response = InvitesResponse {
            sent: vec![sent_invite("DECLINED", "+919876543210")],
            received: vec![],
        };
        filter_invites(&mut response);
        assert_eq!(response.sent[0].ride.owner.phone_number, MASKED_PHONE);
    }

    #[test]
    fn test_received_invites_mask_per_invite() {
        let mut response = InvitesResponse {
            sent: vec![],
            received: vec![RideInvites {
                ride: ride_response(),
                invites: vec![
                    received_invite("PENDING", "+919876543211"),
                    received_invite("ACCEPTED", "+919876543212"),
                ],
            }],
        };
        filter_invites(&mut response);

        let invites = &response.received[0].invites;
        assert_eq!(invites[0].sender.phone_number, MASKED_PHONE);
        assert_eq!(invites[1].sender.phone_number, "+919876543212");
    }

    fn ride_response() -> crate::db::RideResponse {
        crate::db::RideResponse {
            id: "ride-1".to_string(),
            owner: crate::db::OwnerInfo {
                id: "owner".to_string(),
                name: "Alice".to_string(),
            },
            status: "PENDING".to_string(),
            people_count: 2,
            vehicle_type: "CAR".to_string(),
            prefers_gender: None,
            earliest_departure: "2026-01-01T08:00:00Z".to_string(),
            latest_departure: "2026-01-01T09:00:00Z".to_string(),
            stops: vec![],
            participants: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_masked() {
        let mut response = InvitesResponse {
            sent: vec![sent_invite("garbage", "+919876543210")],
            received: vec![],
        };
        filter_invites(&mut response);
        assert_eq!(response.sent[0].ride.owner.phone_number, MASKED_PHONE);
    }
}
