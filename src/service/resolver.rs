use crate::db::ReconcileStore;
use crate::error::Result;
use crate::models::{AmbiguityPolicy, ContactFields, Customer, NewCustomer};

/// Outcome of name-based lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unique(Customer),
    /// `chosen` is the best guess; `candidates` are all name matches
    Ambiguous {
        chosen: Customer,
        candidates: Vec<Customer>,
    },
    NotFound,
}

/// What the import row ended up attached to
#[derive(Debug, Clone)]
pub enum CustomerAssignment {
    Matched(Customer),
    Created(Customer),
    Ambiguous {
        chosen: Customer,
        candidates: Vec<Customer>,
    },
    /// ambiguity under `AmbiguityPolicy::Reject`
    Unassigned { candidates: Vec<Customer> },
}

impl CustomerAssignment {
    pub fn customer(&self) -> Option<&Customer> {
        match self {
            CustomerAssignment::Matched(c) | CustomerAssignment::Created(c) => Some(c),
            CustomerAssignment::Ambiguous { chosen, .. } => Some(chosen),
            CustomerAssignment::Unassigned { .. } => None,
        }
    }
}

/// Lookup key taken from one import row
#[derive(Debug, Clone, Copy)]
pub struct CustomerQuery<'a> {
    pub name: &'a str,
    pub city: Option<&'a str>,
    pub street: Option<&'a str>,
}

/// Narrow name matches by city, then by street fragment.
/// Deterministic: ties always go to the first candidate in store order.
pub fn narrow_candidates(mut candidates: Vec<Customer>, query: &CustomerQuery<'_>) -> Resolution {
    match candidates.len() {
        0 => return Resolution::NotFound,
        1 => return Resolution::Unique(candidates.remove(0)),
        _ => {}
    }

    let by_city: Vec<&Customer> = match query.city.filter(|c| !c.trim().is_empty()) {
        Some(city) => candidates.iter().filter(|c| c.city_matches(city)).collect(),
        None => Vec::new(),
    };
    if by_city.len() == 1 {
        return Resolution::Unique(by_city[0].clone());
    }

    let pool: Vec<&Customer> = if by_city.len() > 1 {
        by_city
    } else {
        candidates.iter().collect()
    };

    let chosen = query
        .street
        .filter(|s| !s.trim().is_empty())
        .and_then(|street| pool.iter().find(|c| c.address_contains(street)).copied())
        .unwrap_or(pool[0])
        .clone();

    Resolution::Ambiguous { chosen, candidates }
}

pub async fn resolve_customer(
    store: &dyn ReconcileStore,
    query: &CustomerQuery<'_>,
) -> Result<Resolution> {
    let candidates = store.find_customers_by_name(query.name).await?;
    Ok(narrow_candidates(candidates, query))
}

/// Resolve the customer for a row, back-filling a unique match or creating
/// a new customer when nothing matches.
pub async fn assign_customer(
    store: &dyn ReconcileStore,
    query: &CustomerQuery<'_>,
    contact: &ContactFields,
    policy: AmbiguityPolicy,
) -> Result<CustomerAssignment> {
    match resolve_customer(store, query).await? {
        Resolution::Unique(customer) => {
            let patch = customer.backfill_from(contact);
            if patch.is_empty() {
                return Ok(CustomerAssignment::Matched(customer));
            }
            store.backfill_customer(customer.id, &patch).await?;
            tracing::debug!("Back-filled customer {} ({})", customer.id, customer.name);
            Ok(CustomerAssignment::Matched(apply_patch(customer, patch)))
        }
        Resolution::Ambiguous { chosen, candidates } => match policy {
            AmbiguityPolicy::FirstCandidate => {
                Ok(CustomerAssignment::Ambiguous { chosen, candidates })
            }
            AmbiguityPolicy::Reject => Ok(CustomerAssignment::Unassigned { candidates }),
        },
        Resolution::NotFound => {
            let created = store
                .create_customer(&NewCustomer {
                    name: query.name.trim().to_string(),
                    contact: contact.clone(),
                })
                .await?;
            tracing::info!("Created customer {} ({})", created.id, created.name);
            Ok(CustomerAssignment::Created(created))
        }
    }
}

fn apply_patch(mut customer: Customer, patch: ContactFields) -> Customer {
    let ContactFields {
        address,
        postal_code,
        city,
        country,
        email,
        phone,
        vat_id,
    } = patch;
    customer.address = address.or(customer.address);
    customer.postal_code = postal_code.or(customer.postal_code);
    customer.city = city.or(customer.city);
    customer.country = country.or(customer.country);
    customer.email = email.or(customer.email);
    customer.phone = phone.or(customer.phone);
    customer.vat_id = vat_id.or(customer.vat_id);
    customer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    async fn seed(
        store: &MemoryStore,
        name: &str,
        address: Option<&str>,
        city: Option<&str>,
    ) -> Customer {
        store
            .create_customer(&NewCustomer {
                name: name.to_string(),
                contact: ContactFields {
                    address: address.map(str::to_string),
                    city: city.map(str::to_string),
                    ..Default::default()
                },
            })
            .await
            .unwrap()
    }

    fn query<'a>(
        name: &'a str,
        city: Option<&'a str>,
        street: Option<&'a str>,
    ) -> CustomerQuery<'a> {
        CustomerQuery { name, city, street }
    }

    #[tokio::test]
    async fn single_name_match_is_unique_regardless_of_case() {
        let store = MemoryStore::new();
        let existing = seed(&store, "Eisdiele Sommer", None, Some("Berlin")).await;
        let res = resolve_customer(&store, &query("EISDIELE SOMMER", None, None)).await.unwrap();
        assert_eq!(res, Resolution::Unique(existing));
    }

    #[tokio::test]
    async fn name_match_is_exact_not_substring() {
        let store = MemoryStore::new();
        seed(&store, "Eisdiele Sommer GmbH", None, None).await;
        let res = resolve_customer(&store, &query("Eisdiele Sommer", None, None)).await.unwrap();
        assert_eq!(res, Resolution::NotFound);
    }

    #[tokio::test]
    async fn city_narrows_same_named_customers_to_unique() {
        let store = MemoryStore::new();
        seed(&store, "Eiscafé Venezia", None, Some("Köln")).await;
        let bonn = seed(&store, "Eiscafé Venezia", None, Some("Bonn")).await;
        let res = resolve_customer(&store, &query("Eiscafé Venezia", Some("bonn"), None))
            .await
            .unwrap();
        assert_eq!(res, Resolution::Unique(bonn));
    }

    #[tokio::test]
    async fn street_fragment_picks_candidate_but_stays_ambiguous() {
        let store = MemoryStore::new();
        let a = seed(&store, "Eiscafé Venezia", Some("Domplatz 1"), Some("Köln")).await;
        let b = seed(&store, "Eiscafé Venezia", Some("Ringstraße 9"), Some("Köln")).await;
        let res = resolve_customer(
            &store,
            &query("Eiscafé Venezia", Some("Köln"), Some("ringstraße")),
        )
        .await
        .unwrap();
        assert_eq!(
            res,
            Resolution::Ambiguous {
                chosen: b.clone(),
                candidates: vec![a, b]
            }
        );
    }

    #[tokio::test]
    async fn unresolvable_ambiguity_takes_first_candidate() {
        let store = MemoryStore::new();
        let first = seed(&store, "Eiscafé Venezia", None, Some("Köln")).await;
        seed(&store, "Eiscafé Venezia", None, Some("Bonn")).await;
        for _ in 0..3 {
            let res = resolve_customer(&store, &query("Eiscafé Venezia", Some("Aachen"), None))
                .await
                .unwrap();
            match res {
                Resolution::Ambiguous { chosen, candidates } => {
                    assert_eq!(chosen.id, first.id);
                    assert_eq!(candidates.len(), 2);
                }
                other => panic!("expected ambiguous, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn unique_match_backfills_without_overwriting() {
        let store = MemoryStore::new();
        let existing = store
            .create_customer(&NewCustomer {
                name: "Kiosk am See".to_string(),
                contact: ContactFields {
                    email: Some("alt@kiosk.de".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        let contact = ContactFields {
            email: Some("neu@kiosk.de".to_string()),
            city: Some("Potsdam".to_string()),
            postal_code: Some("14467".to_string()),
            ..Default::default()
        };

        let assignment = assign_customer(
            &store,
            &query("Kiosk am See", Some("Potsdam"), None),
            &contact,
            AmbiguityPolicy::FirstCandidate,
        )
        .await
        .unwrap();

        assert!(matches!(assignment, CustomerAssignment::Matched(_)));
        let stored = store.customer(existing.id).unwrap();
        assert_eq!(stored.email.as_deref(), Some("alt@kiosk.de"));
        assert_eq!(stored.city.as_deref(), Some("Potsdam"));
        assert_eq!(stored.postal_code.as_deref(), Some("14467"));
    }

    #[tokio::test]
    async fn reject_policy_leaves_row_unassigned() {
        let store = MemoryStore::new();
        seed(&store, "Eiscafé Venezia", None, None).await;
        seed(&store, "Eiscafé Venezia", None, None).await;
        let assignment = assign_customer(
            &store,
            &query("Eiscafé Venezia", None, None),
            &ContactFields::default(),
            AmbiguityPolicy::Reject,
        )
        .await
        .unwrap();
        assert!(assignment.customer().is_none());
    }

    #[tokio::test]
    async fn not_found_creates_customer_with_supplied_fields() {
        let store = MemoryStore::new();
        let contact = ContactFields {
            address: Some("Sonnenallee 10".to_string()),
            postal_code: Some("10999".to_string()),
            city: Some("Berlin".to_string()),
            ..Default::default()
        };
        let assignment = assign_customer(
            &store,
            &query("Eisdiele Sommer", Some("Berlin"), Some("Sonnenallee 10")),
            &contact,
            AmbiguityPolicy::FirstCandidate,
        )
        .await
        .unwrap();
        let CustomerAssignment::Created(created) = assignment else {
            panic!("expected a new customer");
        };
        assert_eq!(created.postal_code.as_deref(), Some("10999"));
        assert_eq!(store.customers().len(), 1);
    }
}
