// src/thread.rs
//
// Builds conversation trees out of a flat batch of fetched messages.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::ident::MessageId;
use crate::message::Message;

/// A message and its replies, oldest reply first.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadNode {
    #[serde(flatten)]
    pub message: Message,
    #[serde(rename = "replies")]
    pub children: Vec<ThreadNode>,
    /// Set when the store data put this message on a parent-link cycle and it
    /// was demoted to a root.
    #[serde(skip)]
    pub cycle_broken: bool,
}

impl ThreadNode {
    fn leaf(message: Message) -> Self {
        ThreadNode {
            message,
            children: Vec::new(),
            cycle_broken: false,
        }
    }

    /// Messages of this subtree in pre-order.
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(&node.message);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Latest timestamp anywhere in this subtree.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.messages()
            .into_iter()
            .map(|m| m.date)
            .max()
            .unwrap_or(self.message.date)
    }
}

/// All roots that share one thread key.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    #[serde(rename = "thread_id")]
    pub key: String,
    #[serde(rename = "messages")]
    pub roots: Vec<ThreadNode>,
}

impl Thread {
    pub fn message_count(&self) -> usize {
        self.roots.iter().map(|r| r.messages().len()).sum()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.roots.iter().map(ThreadNode::last_activity).max()
    }
}

/// Grouping key for a message: the store's thread token, else the oldest
/// reference, else the parent, else the message itself.
pub fn thread_key(msg: &Message) -> String {
    if let Some(token) = msg.provider_thread_id.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return token.to_string();
    }
    msg.references
        .first()
        .or(msg.parent_id.as_ref())
        .unwrap_or(&msg.id)
        .to_string()
}

/// Assemble `messages` into threads.
///
/// Children hang off the message whose id equals their parent id; anything
/// whose parent is outside the batch becomes a root. Messages on a parent
/// cycle are all demoted to roots. Children and roots are ordered by date
/// and threads by their earliest root, independent of input order.
pub fn assemble(messages: &[Message]) -> Vec<Thread> {
    let n = messages.len();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let (ma, mb) = (&messages[a], &messages[b]);
        ma.date
            .cmp(&mb.date)
            .then_with(|| ma.id.cmp(&mb.id))
            .then_with(|| ma.uid.cmp(&mb.uid))
            .then_with(|| ma.subject.cmp(&mb.subject))
    });

    // first message in date order owns a duplicated id
    let mut by_id: HashMap<&MessageId, usize> = HashMap::with_capacity(n);
    for &i in &order {
        by_id.entry(&messages[i].id).or_insert(i);
    }

    let mut parent: Vec<Option<usize>> = messages
        .iter()
        .map(|m| m.parent_id.as_ref().and_then(|p| by_id.get(p).copied()))
        .collect();

    let cycle_broken = cycle_members(&parent);
    for i in (0..n).filter(|&i| cycle_broken[i]) {
        warn!("Parent links of {} form a cycle; treating it as a root", messages[i].id);
        parent[i] = None;
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for &i in &order {
        match parent[i] {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    // breadth-first from each root; every index is placed exactly once
    let mut visited = vec![false; n];
    let mut bfs = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    for &root in &roots {
        visited[root] = true;
        queue.push_back(root);
        while let Some(i) = queue.pop_front() {
            bfs.push(i);
            for &c in &children[i] {
                if !visited[c] {
                    visited[c] = true;
                    queue.push_back(c);
                }
            }
        }
    }
    debug_assert_eq!(bfs.len(), n, "every message reachable from a root");

    let mut built: Vec<Option<ThreadNode>> = vec![None; n];
    for &i in bfs.iter().rev() {
        let mut node = ThreadNode::leaf(messages[i].clone());
        node.cycle_broken = cycle_broken[i];
        node.children = children[i].iter().filter_map(|&c| built[c].take()).collect();
        built[i] = Some(node);
    }

    let mut threads: Vec<Thread> = Vec::new();
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    for &root in &roots {
        let Some(node) = built[root].take() else { continue };
        let key = thread_key(&node.message);
        let slot = *slot_of.entry(key.clone()).or_insert_with(|| {
            threads.push(Thread { key, roots: Vec::new() });
            threads.len() - 1
        });
        threads[slot].roots.push(node);
    }

    debug!("Assembled {} messages into {} threads", n, threads.len());
    threads
}

/// The group `assemble` would list under `key`. Replies follow their root
/// into its group even when their own key differs.
pub fn select_thread(messages: &[Message], key: &str) -> Thread {
    assemble(messages)
        .into_iter()
        .find(|t| t.key == key)
        .unwrap_or_else(|| Thread {
            key: key.to_string(),
            roots: Vec::new(),
        })
}

/// Most recently active thread first.
pub fn sort_by_recent_activity(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()).then_with(|| a.key.cmp(&b.key)));
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Flags every index that lies on a parent-link cycle. Each index is walked
/// once; a walk that runs into its own in-progress path has found a cycle.
fn cycle_members(parent: &[Option<usize>]) -> Vec<bool> {
    let n = parent.len();
    let mut mark = vec![Mark::Unvisited; n];
    let mut on_cycle = vec![false; n];
    let mut path = Vec::new();

    for start in 0..n {
        let mut current = Some(start);
        while let Some(i) = current {
            match mark[i] {
                Mark::Unvisited => {
                    mark[i] = Mark::InProgress;
                    path.push(i);
                    current = parent[i];
                }
                Mark::InProgress => {
                    if let Some(pos) = path.iter().position(|&p| p == i) {
                        for &p in &path[pos..] {
                            on_cycle[p] = true;
                        }
                    }
                    break;
                }
                Mark::Done => break,
            }
        }
        for i in path.drain(..) {
            mark[i] = Mark::Done;
        }
    }
    on_cycle
}
