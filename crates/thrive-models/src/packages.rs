//! Credit packages and the ledger of their consumption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{BookingId, PackageUseId, ProductMapId, SessionId, StudentId, StudentPackageId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentPackage {
    pub id: StudentPackageId,
    pub student_id: StudentId,
    pub product_map_id: Option<ProductMapId>,
    pub label: String,
    pub total_credits: i32,
    pub remaining_credits: i32,
    /// Payment intent that paid for the package; unique when present
    pub source_payment_id: Option<String>,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentPackage {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.remaining_credits > 0 && !self.is_expired(now)
    }
}

/// One credit spent on one booking. Refunded entries keep their row with
/// `refunded_at` set; a booking has at most one unrefunded entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PackageUse {
    pub id: PackageUseId,
    pub student_package_id: StudentPackageId,
    pub booking_id: BookingId,
    pub session_id: SessionId,
    pub credits_used: i32,
    pub used_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentPackageView {
    #[serde(flatten)]
    pub package: StudentPackage,
    pub is_usable: bool,
}

impl StudentPackageView {
    pub fn new(package: StudentPackage, now: DateTime<Utc>) -> Self {
        let is_usable = package.is_usable(now);
        Self { package, is_usable }
    }
}
