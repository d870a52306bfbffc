//! Role-specific grouping of rentals.

use serde::{Deserialize, Serialize};

use crate::rental::{AnyRental, RentalStatus};

/// Who is looking at the rentals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Buyer's "My Rentals": everything not yet completed, and the completed history.
#[derive(Debug, Clone, Default)]
pub struct BuyerPartition<'a> {
    pub active: Vec<&'a AnyRental>,
    pub history: Vec<&'a AnyRental>,
}

/// Seller's "Rental Actions".
#[derive(Debug, Clone, Default)]
pub struct SellerPartition<'a> {
    /// Waiting for a decision
    pub pending: Vec<&'a AnyRental>,
    /// Accepted or collected
    pub active: Vec<&'a AnyRental>,
    /// Completed or rejected
    pub completed: Vec<&'a AnyRental>,
}

/// Admin "Rentals" overview. Rejected rentals count towards `total` only.
#[derive(Debug, Clone, Default)]
pub struct AdminPartition<'a> {
    pub ongoing: Vec<&'a AnyRental>,
    pub completed: Vec<&'a AnyRental>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub enum RolePartition<'a> {
    Buyer(BuyerPartition<'a>),
    Seller(SellerPartition<'a>),
    Admin(AdminPartition<'a>),
}

/// Admin summary counts, in the shape the admin listing endpoint reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total_rentals: u64,
    pub ongoing_count: u64,
    pub completed_count: u64,
}

/// Admin "ongoing" group: anything that is neither completed nor rejected.
pub fn is_ongoing(status: RentalStatus) -> bool {
    !status.is_terminal()
}

pub fn partition_buyer<'a, I>(requests: I) -> BuyerPartition<'a>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let mut partition = BuyerPartition::default();
    for rental in requests {
        if rental.status() == RentalStatus::Completed {
            partition.history.push(rental);
        } else {
            partition.active.push(rental);
        }
    }
    partition
}

pub fn partition_seller<'a, I>(requests: I) -> SellerPartition<'a>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let mut partition = SellerPartition::default();
    for rental in requests {
        match rental.status() {
            RentalStatus::Pending => partition.pending.push(rental),
            RentalStatus::Accepted | RentalStatus::Collected => partition.active.push(rental),
            RentalStatus::Completed | RentalStatus::Rejected => partition.completed.push(rental),
        }
    }
    partition
}

pub fn partition_admin<'a, I>(requests: I) -> AdminPartition<'a>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let mut partition = AdminPartition::default();
    for rental in requests {
        partition.total += 1;
        match rental.status() {
            RentalStatus::Completed => partition.completed.push(rental),
            status if is_ongoing(status) => partition.ongoing.push(rental),
            _ => {}
        }
    }
    partition
}

pub fn partition_by_role<'a, I>(requests: I, role: Role) -> RolePartition<'a>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    match role {
        Role::Buyer => RolePartition::Buyer(partition_buyer(requests)),
        Role::Seller => RolePartition::Seller(partition_seller(requests)),
        Role::Admin => RolePartition::Admin(partition_admin(requests)),
    }
}

impl AdminPartition<'_> {
    pub fn summary(&self) -> AdminSummary {
        AdminSummary {
            total_rentals: self.total as u64,
            ongoing_count: self.ongoing.len() as u64,
            completed_count: self.completed.len() as u64,
        }
    }
}

impl AdminSummary {
    pub fn from_rentals<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a AnyRental>,
    {
        partition_admin(requests).summary()
    }
}
