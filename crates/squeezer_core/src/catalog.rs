//! The catalogue of resource kinds.
//!
//! Each kind is plain data: a [`KindConfig`] naming its reference parameter,
//! operation prefix, endpoint, result keys and capabilities. Kinds with
//! special create or state handling point at their strategy objects here.

use crate::artifact::ArtifactHooks;
use crate::content::ArtifactBackedContent;
use crate::hooks::StandardHooks;
use crate::kind::{Capabilities, Capability, KindConfig, Lookup};
use crate::task::TaskHooks;

const fn kind(
    name: &'static str,
    href_param: &'static str,
    operation_prefix: &'static str,
    endpoint: &'static str,
    singular: &'static str,
    plural: &'static str,
) -> KindConfig {
    KindConfig {
        name,
        href_param,
        operation_prefix,
        endpoint,
        singular,
        plural,
        capabilities: Capabilities::crud(),
        lookup: Lookup::Filter,
        hooks: &StandardHooks,
    }
}

const SYNCABLE: Capabilities = Capabilities::crud().with(Capability::Sync);

/// Binary artifacts, addressed by digest.
pub static ARTIFACT: KindConfig = KindConfig {
    capabilities: Capabilities::crud().without(Capability::Update),
    hooks: &ArtifactHooks,
    ..kind("artifact", "artifact_href", "artifacts", "artifacts/", "artifact", "artifacts")
};

/// Temporary upload sessions used by chunked uploads.
pub static UPLOAD: KindConfig = KindConfig {
    capabilities: Capabilities::none()
        .with(Capability::Create)
        .with(Capability::Update)
        .with(Capability::Delete)
        .with(Capability::Commit),
    ..kind("upload", "upload_href", "uploads", "uploads/", "upload", "uploads")
};

/// Server-side asynchronous tasks.
pub static TASK: KindConfig = KindConfig {
    capabilities: Capabilities::none()
        .with(Capability::Enumerate)
        .with(Capability::Read)
        .with(Capability::Delete)
        .with(Capability::Cancel),
    lookup: Lookup::Reference,
    hooks: &TaskHooks,
    ..kind("task", "task_href", "tasks", "tasks/", "task", "tasks")
};

/// Content and artifacts no longer referenced by any repository version.
pub static ORPHANS: KindConfig = KindConfig {
    capabilities: Capabilities::none().with(Capability::Delete),
    ..kind("orphans", "", "orphans", "orphans/", "orphans", "orphans")
};

/// X.509 certificate content guards.
pub static X509_CERT_GUARD: KindConfig = kind(
    "x509 cert guard",
    "x509_cert_guard_href",
    "contentguards_certguard_x509",
    "contentguards/certguard/x509/",
    "content_guard",
    "content_guards",
);

/// File content units, created from an existing artifact.
pub static FILE_CONTENT: KindConfig = KindConfig {
    capabilities: Capabilities::none()
        .with(Capability::Enumerate)
        .with(Capability::Read)
        .with(Capability::Create),
    hooks: &ArtifactBackedContent,
    ..kind(
        "file content",
        "file_content_href",
        "content_file_files",
        "content/file/files/",
        "content",
        "contents",
    )
};

/// File distributions.
pub static FILE_DISTRIBUTION: KindConfig = kind(
    "file distribution",
    "file_distribution_href",
    "distributions_file_file",
    "distributions/file/file/",
    "distribution",
    "distributions",
);

/// File publications.
pub static FILE_PUBLICATION: KindConfig = kind(
    "file publication",
    "file_publication_href",
    "publications_file_file",
    "publications/file/file/",
    "publication",
    "publications",
);

/// File remotes.
pub static FILE_REMOTE: KindConfig = kind(
    "file remote",
    "file_remote_href",
    "remotes_file_file",
    "remotes/file/file/",
    "remote",
    "remotes",
);

/// File repositories.
pub static FILE_REPOSITORY: KindConfig = KindConfig {
    capabilities: SYNCABLE,
    ..kind(
        "file repository",
        "file_repository_href",
        "repositories_file_file",
        "repositories/file/file/",
        "repository",
        "repositories",
    )
};

/// Versions of a file repository. Listed below their repository.
pub static FILE_REPOSITORY_VERSION: KindConfig = KindConfig {
    capabilities: Capabilities::none()
        .with(Capability::Enumerate)
        .with(Capability::Read)
        .with(Capability::Repair),
    ..kind(
        "file repository version",
        "file_repository_version_href",
        "repositories_file_file_versions",
        "{file_repository_href}versions/",
        "repository_version",
        "repository_versions",
    )
};

/// Ansible distributions.
pub static ANSIBLE_DISTRIBUTION: KindConfig = kind(
    "ansible distribution",
    "ansible_distribution_href",
    "distributions_ansible_ansible",
    "distributions/ansible/ansible/",
    "distribution",
    "distributions",
);

/// Ansible collection remotes.
pub static ANSIBLE_REMOTE: KindConfig = kind(
    "ansible remote",
    "ansible_remote_href",
    "remotes_ansible_ansible",
    "remotes/ansible/ansible/",
    "remote",
    "remotes",
);

/// Ansible repositories.
pub static ANSIBLE_REPOSITORY: KindConfig = KindConfig {
    capabilities: SYNCABLE,
    ..kind(
        "ansible repository",
        "ansible_repository_href",
        "repositories_ansible_ansible",
        "repositories/ansible/ansible/",
        "repository",
        "repositories",
    )
};

/// Python (PyPI) distributions.
pub static PYTHON_DISTRIBUTION: KindConfig = kind(
    "python distribution",
    "python_distribution_href",
    "distributions_python_pypi",
    "distributions/python/pypi/",
    "distribution",
    "distributions",
);

/// Python publications. Publications are immutable once created.
pub static PYTHON_PUBLICATION: KindConfig = KindConfig {
    capabilities: Capabilities::crud().without(Capability::Update),
    ..kind(
        "python publication",
        "python_publication_href",
        "publications_python_pypi",
        "publications/python/pypi/",
        "publication",
        "publications",
    )
};

/// Python remotes.
pub static PYTHON_REMOTE: KindConfig = kind(
    "python remote",
    "python_remote_href",
    "remotes_python_python",
    "remotes/python/python/",
    "remote",
    "remotes",
);

/// Python repositories.
pub static PYTHON_REPOSITORY: KindConfig = KindConfig {
    capabilities: SYNCABLE,
    ..kind(
        "python repository",
        "python_repository_href",
        "repositories_python_python",
        "repositories/python/python/",
        "repository",
        "repositories",
    )
};

/// RPM remotes.
pub static RPM_REMOTE: KindConfig = kind(
    "rpm remote",
    "rpm_remote_href",
    "remotes_rpm_rpm",
    "remotes/rpm/rpm/",
    "remote",
    "remotes",
);

/// Every kind in the catalogue.
pub static ALL: &[&KindConfig] = &[
    &ARTIFACT,
    &UPLOAD,
    &TASK,
    &ORPHANS,
    &X509_CERT_GUARD,
    &FILE_CONTENT,
    &FILE_DISTRIBUTION,
    &FILE_PUBLICATION,
    &FILE_REMOTE,
    &FILE_REPOSITORY,
    &FILE_REPOSITORY_VERSION,
    &ANSIBLE_DISTRIBUTION,
    &ANSIBLE_REMOTE,
    &ANSIBLE_REPOSITORY,
    &PYTHON_DISTRIBUTION,
    &PYTHON_PUBLICATION,
    &PYTHON_REMOTE,
    &PYTHON_REPOSITORY,
    &RPM_REMOTE,
];

/// Resolves an operation identifier to its kind and capability.
///
/// Only operations the kind supports resolve.
pub fn by_operation(operation_id: &str) -> Option<(&'static KindConfig, Capability)> {
    ALL.iter().copied().find_map(|kind| {
        let suffix = operation_id
            .strip_prefix(kind.operation_prefix)?
            .strip_prefix('_')?;
        let capability = Capability::from_suffix(suffix)?;
        kind.supports(capability).then_some((kind, capability))
    })
}

/// Content plugins with their own remote, repository and distribution kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plugin {
    /// Plain files.
    File,
    /// Ansible collections and roles.
    Ansible,
    /// Python packages.
    Python,
    /// RPM packages. Only remotes are managed.
    Rpm,
}

impl Plugin {
    /// All plugins.
    pub const ALL: [Plugin; 4] = [Plugin::File, Plugin::Ansible, Plugin::Python, Plugin::Rpm];

    /// Lower-case plugin name.
    pub fn name(&self) -> &'static str {
        match self {
            Plugin::File => "file",
            Plugin::Ansible => "ansible",
            Plugin::Python => "python",
            Plugin::Rpm => "rpm",
        }
    }

    /// The plugin's remote kind.
    pub fn remote(&self) -> &'static KindConfig {
        match self {
            Plugin::File => &FILE_REMOTE,
            Plugin::Ansible => &ANSIBLE_REMOTE,
            Plugin::Python => &PYTHON_REMOTE,
            Plugin::Rpm => &RPM_REMOTE,
        }
    }

    /// The plugin's repository kind, if managed.
    pub fn repository(&self) -> Option<&'static KindConfig> {
        match self {
            Plugin::File => Some(&FILE_REPOSITORY),
            Plugin::Ansible => Some(&ANSIBLE_REPOSITORY),
            Plugin::Python => Some(&PYTHON_REPOSITORY),
            Plugin::Rpm => None,
        }
    }

    /// The plugin's distribution kind, if managed.
    pub fn distribution(&self) -> Option<&'static KindConfig> {
        match self {
            Plugin::File => Some(&FILE_DISTRIBUTION),
            Plugin::Ansible => Some(&ANSIBLE_DISTRIBUTION),
            Plugin::Python => Some(&PYTHON_DISTRIBUTION),
            Plugin::Rpm => None,
        }
    }
}

impl std::fmt::Display for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Plugin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plugin| plugin.name() == s)
            .ok_or_else(|| format!("unknown plugin: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn operation_prefixes_are_unique() {
        let prefixes: HashSet<_> = ALL.iter().map(|k| k.operation_prefix).collect();
        assert_eq!(prefixes.len(), ALL.len());
    }

    #[test]
    fn resolves_operation_ids() {
        let (kind, capability) = by_operation("repositories_file_file_sync").unwrap();
        assert_eq!(kind.name, "file repository");
        assert_eq!(capability, Capability::Sync);

        // The version kind shares the repository prefix.
        let (kind, capability) = by_operation("repositories_file_file_versions_repair").unwrap();
        assert_eq!(kind.name, "file repository version");
        assert_eq!(capability, Capability::Repair);

        let (kind, capability) = by_operation("uploads_commit").unwrap();
        assert!(std::ptr::eq(kind, &UPLOAD));
        assert_eq!(capability, Capability::Commit);
    }

    #[test]
    fn unsupported_operations_do_not_resolve() {
        assert!(by_operation("content_file_files_update").is_none());
        assert!(by_operation("tasks_create").is_none());
        assert!(by_operation("nothing_list").is_none());
    }

    #[test]
    fn plugin_kinds() {
        assert_eq!("python".parse::<Plugin>().unwrap(), Plugin::Python);
        assert!("deb".parse::<Plugin>().is_err());
        assert_eq!(Plugin::Rpm.remote().operation_prefix, "remotes_rpm_rpm");
        assert!(Plugin::Rpm.repository().is_none());
        assert!(Plugin::Ansible
            .repository()
            .unwrap()
            .supports(Capability::Sync));
    }

    #[test]
    fn task_is_looked_up_by_reference() {
        assert_eq!(TASK.lookup, Lookup::Reference);
        assert!(!TASK.supports(Capability::Create));
        assert!(TASK.supports(Capability::Cancel));
    }
}
