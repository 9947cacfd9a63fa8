use std::collections::BTreeMap;

use crate::fs::FsError;

type NodeHandle = usize;

const ROOT: NodeHandle = 0;

struct DirNode {
    name: String,
    /// Children keyed by name. A BTreeMap keeps listing order stable.
    children: BTreeMap<String, NodeHandle>,
}

impl DirNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: BTreeMap::new(),
        }
    }
}

/// An in-memory hierarchical namespace of directory names, independent of
/// file contents. Nodes live in an arena and refer to each other by index
/// handle; the working directory is a stack of handles from the root, so it
/// can never dangle and the structure can never form a cycle.
pub struct DirectoryTree {
    nodes: Vec<DirNode>,
    /// Arena slots vacated by rmdir, reused by the next mkdir.
    free_slots: Vec<NodeHandle>,
    current: Vec<NodeHandle>,
}

impl DirectoryTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![DirNode::named("root")],
            free_slots: Vec::new(),
            current: vec![ROOT],
        }
    }

    fn cwd(&self) -> NodeHandle {
        self.current.last().copied().unwrap_or(ROOT)
    }

    /// Creates an empty directory under the current one.
    pub fn mkdir(&mut self, name: &str) -> Result<(), FsError> {
        let cwd = self.cwd();
        if self.nodes[cwd].children.contains_key(name) {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let handle = match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = DirNode::named(name);
                slot
            }
            None => {
                self.nodes.push(DirNode::named(name));
                self.nodes.len() - 1
            }
        };
        self.nodes[cwd].children.insert(name.to_string(), handle);
        Ok(())
    }

    /// Removes an empty directory from the current one.
    pub fn rmdir(&mut self, name: &str) -> Result<(), FsError> {
        let cwd = self.cwd();
        let handle = match self.nodes[cwd].children.get(name) {
            Some(&handle) => handle,
            None => return Err(FsError::DoesNotExist(name.to_string())),
        };
        if !self.nodes[handle].children.is_empty() {
            return Err(FsError::NotEmpty(name.to_string()));
        }

        self.nodes[cwd].children.remove(name);
        self.free_slots.push(handle);
        Ok(())
    }

    /// Changes the working directory. `".."` moves one level up and is a
    /// no-op at the root rather than an error.
    pub fn cd(&mut self, name: &str) -> Result<(), FsError> {
        if name == ".." {
            if self.current.len() > 1 {
                self.current.pop();
            }
            return Ok(());
        }

        let cwd = self.cwd();
        match self.nodes[cwd].children.get(name) {
            Some(&handle) => {
                self.current.push(handle);
                Ok(())
            }
            None => Err(FsError::DoesNotExist(name.to_string())),
        }
    }

    /// Names of the current directory's children, in stable sorted order.
    pub fn ls(&self) -> Vec<&str> {
        self.nodes[self.cwd()]
            .children
            .keys()
            .map(String::as_str)
            .collect()
    }

    /// The working directory rendered as `root/a/b`.
    pub fn path(&self) -> String {
        self.current
            .iter()
            .map(|&handle| self.nodes[handle].name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}
