//! Model definitions for the Vilocify APIv2
//!
//! One [`resource!`](crate::resource!) declaration per resource type the
//! backend exposes. Field names follow Rust conventions; the wire names next
//! to them are the camelCase attribute names the server speaks.

use crate::resource;
use serde_json::Value;

resource! {
    /// A software component tracked for vulnerability notifications.
    pub struct Component: "components" {
        attrs {
            vendor: String => "vendor",
            name: String => "name",
            version: String => "version",
            url: String => "url",
            created_at: String => "createdAt",
            updated_at: String => "updatedAt",
            eol_on: String => "endOfLifeOn",
            is_eol: bool => "endOfLife",
            active: bool => "active",
            deactivated_at: String => "deactivatedAt",
            deactivation_reason: String => "deactivationReason",
        }
        rels {
            many monitoring_lists: MonitoringList => "monitoringLists",
            many notifications: Notification => "notifications",
        }
    }
}

resource! {
    /// An account's membership in the portal. User fields are fixed at
    /// creation; only the expiry date can change afterwards.
    pub struct Membership: "memberships" {
        attrs {
            username: String => "userName" [create_only],
            email: String => "userEmail" [create_only],
            role: String => "role" [create_only],
            expires_at: String => "expiresAt",
            invitation_state: String => "invitationState" [readonly],
            created_at: String => "createdAt" [readonly],
            updated_at: String => "updatedAt" [readonly],
        }
    }
}

resource! {
    /// A request to add a component that is not monitorable yet.
    pub struct ComponentRequest: "componentRequests" {
        attrs {
            vendor: String => "vendor",
            name: String => "name",
            version: String => "version",
            comment: String => "comment",
            prioritized: bool => "prioritized",
            security_url: String => "securityUrl",
            component_url: String => "componentUrl",
            state: String => "state" [readonly],
            rejection_reasons: Vec<String> => "rejectionReasons" [readonly],
            created_at: String => "createdAt" [readonly],
            updated_at: String => "updatedAt" [readonly],
        }
        rels {
            one component: Component => "component",
            one membership: Membership => "membership",
        }
    }
}

resource! {
    /// A single vulnerability referenced by notifications.
    pub struct Vulnerability: "vulnerabilities" {
        attrs {
            cve: String => "cve",
            cwe: String => "cwe",
            description: String => "description",
            cvss: Vec<Value> => "cvss",
            mitigating_factor: String => "mitigatingFactor",
            note: String => "note",
            deleted: bool => "deleted",
        }
    }
}

resource! {
    /// A security advisory issued for components on a monitoring list.
    pub struct Notification: "notifications" {
        attrs {
            title: String => "title",
            priority: String => "priority",
            action: String => "action",
            solution: String => "solution",
            description: String => "description",
            vendor_affected_components: String => "vendorAffectedComponents",
            references: Vec<String> => "references",
            advisories: Vec<Value> => "advisories",
            cves: Vec<String> => "cves",
            attack_vector: String => "attackVector",
            cvss: String => "cvss",
            history: Vec<Value> => "history",
            /// Notification category, `"type"` on the wire.
            kind: String => "type",
            third_party_published_on: String => "thirdPartyPublishedOn",
            created_at: String => "createdAt",
            updated_at: String => "updatedAt",
        }
        rels {
            many vulnerabilities: Vulnerability => "vulnerabilities",
            many components: Component => "components",
        }
    }
}

resource! {
    /// A named set of components whose notifications land in subscriptions.
    pub struct MonitoringList: "monitoringLists" {
        attrs {
            name: String => "name",
            comment: String => "comment",
            active: bool => "active",
            created_at: String => "createdAt" [readonly],
            updated_at: String => "updatedAt" [readonly],
        }
        rels {
            many components: Component => "components",
            many subscriptions: Subscription => "subscriptions",
            many parents: MonitoringList => "parents",
            many children: MonitoringList => "children",
        }
    }
}

impl MonitoringList {
    /// Server-side cap on components per list.
    pub const MAX_COMPONENTS: usize = 1000;
}

resource! {
    /// A membership's notification subscription on one monitoring list.
    pub struct Subscription: "subscriptions" {
        attrs {
            role: String => "role",
            priorities: Vec<String> => "priorities",
            created_at: String => "createdAt" [readonly],
            updated_at: String => "updatedAt" [readonly],
        }
        rels {
            one membership: Membership => "membership",
            one monitoring_list: MonitoringList => "monitoringList",
        }
    }
}
