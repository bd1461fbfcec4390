//! Role-based access policy.

use storage::Role;

/// Operations guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreatePvz,
    OpenReception,
    CloseReception,
    AddProduct,
    DeleteProduct,
    ListPvz,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreatePvz => "create_pvz",
            Operation::OpenReception => "open_reception",
            Operation::CloseReception => "close_reception",
            Operation::AddProduct => "add_product",
            Operation::DeleteProduct => "delete_product",
            Operation::ListPvz => "list_pvz",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides whether `role` may perform `operation`.
pub fn authorize(role: Role, operation: Operation) -> Decision {
    let allowed = match operation {
        Operation::CreatePvz => role == Role::Moderator,
        Operation::OpenReception
        | Operation::CloseReception
        | Operation::AddProduct
        | Operation::DeleteProduct => role == Role::Employee,
        Operation::ListPvz => true,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operation; 6] = [
        Operation::CreatePvz,
        Operation::OpenReception,
        Operation::CloseReception,
        Operation::AddProduct,
        Operation::DeleteProduct,
        Operation::ListPvz,
    ];

    #[test]
    fn moderator_creates_and_lists_only() {
        let allowed: Vec<_> = ALL
            .into_iter()
            .filter(|op| authorize(Role::Moderator, *op).is_allowed())
            .collect();
        assert_eq!(allowed, vec![Operation::CreatePvz, Operation::ListPvz]);
    }

    #[test]
    fn employee_manages_receptions_and_products() {
        assert_eq!(authorize(Role::Employee, Operation::CreatePvz), Decision::Deny);
        for op in [
            Operation::OpenReception,
            Operation::CloseReception,
            Operation::AddProduct,
            Operation::DeleteProduct,
            Operation::ListPvz,
        ] {
            assert_eq!(authorize(Role::Employee, op), Decision::Allow, "{op}");
        }
    }
}
