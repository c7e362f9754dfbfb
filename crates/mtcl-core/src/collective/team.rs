//! 团队构建：把一组符号参与者名字变成一组有序点对点 handle，并选出根
//! （C8，spec.md §4.7）。
//!
//! # 解析逻辑（How）
//! 1. 参与者名字按字典序排序，根固定占据 rank 0（"Local rank at root = 0 by
//!    convention of the team-builder"），其余参与者按排序后的相对顺序获得
//!    `1..size`（"remote ranks are chosen deterministically by participant
//!    order"）。两侧各自本地计算这张表,结果必然一致,不需要网络交互。
//! 2. 根依次从 `Manager::get_next` 取出事件,读出每个新连接发来的第一帧
//!    （参与者标识符字符串）,按标识符查表放入对应的 rank 槽位,直至收满
//!    `size-1` 个；随后把完整的花名册用一条框定消息回送给每个非根
//!    （spec.md §6.3 "root's reply is a framed message encoding (size,
//!    rank→identifier list)"）。
//! 3. 非根通过解析器 `connect(root_name)`,发送自己的标识符,接收并校验根回送
//!    的花名册。
//!
//! 本实现要求根在调用 `create_team` 之前已经对其自身端点调用过
//! `Manager::listen`；spec.md §4.7 步骤 2 中"如果尚未监听"这部分由调用方负责,
//! 记录在 DESIGN.md 的 Open Question 决定里。
use std::collections::HashMap;

use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;
use crate::manager::Manager;
use crate::time::RetryPolicy;

use super::context::{new_non_root, new_root};
use super::{CollectiveContext, CollectiveKind};

/// 一个已装配完成的集合通信团队：知道自己的 rank、团队规模与底层实现。
pub struct Team {
    kind: CollectiveKind,
    context: CollectiveContext,
    rank: usize,
    size: usize,
}

impl Team {
    pub fn kind(&self) -> CollectiveKind {
        self.kind
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn context(&self) -> &CollectiveContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CollectiveContext {
        &mut self.context
    }
}

/// 计算参与者名字到 rank 的映射：根固定为 0,其余按字典序占据 `1..size`。
fn assign_ranks(participants: &[String], root_name: &str) -> HashMap<String, usize> {
    let mut sorted_non_root: Vec<&str> = participants
        .iter()
        .map(String::as_str)
        .filter(|name| *name != root_name)
        .collect();
    sorted_non_root.sort_unstable();

    let mut ranks = HashMap::with_capacity(participants.len());
    ranks.insert(root_name.to_string(), 0);
    for (offset, name) in sorted_non_root.into_iter().enumerate() {
        ranks.insert(name.to_string(), offset + 1);
    }
    ranks
}

fn encode_roster(size: usize, ranks: &HashMap<String, usize>) -> Vec<u8> {
    let mut entries: Vec<(usize, &str)> = ranks.iter().map(|(name, rank)| (*rank, name.as_str())).collect();
    entries.sort_unstable_by_key(|(rank, _)| *rank);
    let mut text = format!("{size}");
    for (rank, name) in entries {
        text.push('\n');
        text.push_str(&rank.to_string());
        text.push('=');
        text.push_str(name);
    }
    text.into_bytes()
}

fn decode_roster(bytes: &[u8]) -> Result<(usize, HashMap<String, usize>)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| MtclError::new(ErrorKind::InvalidState, "team roster is not valid utf-8"))?;
    let mut lines = text.lines();
    let size: usize = lines
        .next()
        .ok_or_else(|| MtclError::new(ErrorKind::InvalidState, "team roster is missing its size line"))?
        .parse()
        .map_err(|_| MtclError::new(ErrorKind::InvalidState, "team roster size is not a number"))?;
    let mut ranks = HashMap::new();
    for line in lines {
        let (rank_str, name) = line
            .split_once('=')
            .ok_or_else(|| MtclError::new(ErrorKind::InvalidState, "malformed team roster entry"))?;
        let rank: usize = rank_str
            .parse()
            .map_err(|_| MtclError::new(ErrorKind::InvalidState, "team roster rank is not a number"))?;
        ranks.insert(name.to_string(), rank);
    }
    Ok((size, ranks))
}

const HANDSHAKE_BUF_LEN: usize = 256;
const ROSTER_BUF_LEN: usize = 4096;

pub fn build_team(
    manager: &Manager,
    participants: &[String],
    root_name: &str,
    local_name: &str,
    kind: CollectiveKind,
    retry: RetryPolicy,
) -> Result<Team> {
    if participants.len() < 2 {
        return Err(MtclError::invalid_argument("a team needs at least two participants"));
    }
    if !participants.iter().any(|p| p == root_name) {
        return Err(MtclError::invalid_argument("root_name is not a member of participants"));
    }
    if !participants.iter().any(|p| p == local_name) {
        return Err(MtclError::invalid_argument("local_name is not a member of participants"));
    }

    let size = participants.len();
    let ranks = assign_ranks(participants, root_name);

    if local_name == root_name {
        build_root(manager, size, &ranks, kind)
    } else {
        let local_rank = ranks[local_name];
        build_non_root(manager, root_name, local_name, local_rank, size, kind, retry)
    }
}

fn build_root(manager: &Manager, size: usize, ranks: &HashMap<String, usize>, kind: CollectiveKind) -> Result<Team> {
    let mut slots: Vec<Option<SharedHandle>> = (0..size).map(|_| None).collect();
    let mut collected = 0usize;

    while collected < size - 1 {
        let mut event = manager.get_next()?;
        let mut buf = [0u8; HANDSHAKE_BUF_LEN];
        let n = match event.receive(&mut buf) {
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read team handshake from accepted connection");
                continue;
            }
        };
        let identifier = String::from_utf8_lossy(&buf[..n]).to_string();
        let Some(&rank) = ranks.get(&identifier) else {
            tracing::warn!(identifier, "dropping connection with unknown team identifier");
            continue;
        };
        if rank == 0 || slots[rank].is_some() {
            tracing::warn!(identifier, rank, "dropping connection with duplicate or invalid team rank");
            continue;
        }
        let shared = event
            .into_shared()
            .expect("freshly received team handshake handle must still be valid");
        slots[rank] = Some(shared);
        collected += 1;
    }

    let roster = encode_roster(size, ranks);
    let peers: Vec<SharedHandle> = (1..size)
        .map(|rank| slots[rank].take().expect("every non-root rank slot is filled once collected == size - 1"))
        .collect();
    for peer in &peers {
        peer.core().send(&roster)?;
    }

    let mut context = new_root(kind, peers, 0, size);
    if !context.update(collected) {
        return Err(MtclError::new(ErrorKind::InvalidState, "team assembly loop exited before reaching full roster"));
    }
    crate::observability::log_team_assembled(kind, 0, size);
    Ok(Team { kind, context, rank: 0, size })
}

fn build_non_root(
    manager: &Manager,
    root_name: &str,
    local_name: &str,
    local_rank: usize,
    size: usize,
    kind: CollectiveKind,
    retry: RetryPolicy,
) -> Result<Team> {
    let mut handle = manager.connect(root_name, retry)?;
    handle.send(local_name.as_bytes())?;

    let mut buf = vec![0u8; ROSTER_BUF_LEN];
    let n = handle.receive(&mut buf)?;
    let (roster_size, roster_ranks) = decode_roster(&buf[..n])?;
    if roster_size != size {
        return Err(MtclError::new(
            ErrorKind::InvalidState,
            format!("team roster advertises size {roster_size}, expected {size}"),
        ));
    }
    if roster_ranks.get(local_name) != Some(&local_rank) {
        return Err(MtclError::new(ErrorKind::InvalidState, "team roster disagrees with locally computed rank"));
    }

    let shared = handle.into_shared().expect("freshly connected handle must still be valid");
    let context = new_non_root(kind, shared, local_rank, size);
    crate::observability::log_team_assembled(kind, local_rank, size);
    Ok(Team { kind, context, rank: local_rank, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_root_rank_zero_and_others_lexically() {
        let participants = vec!["App3".to_string(), "App1".to_string(), "App2".to_string()];
        let ranks = assign_ranks(&participants, "App1");
        assert_eq!(ranks["App1"], 0);
        assert_eq!(ranks["App2"], 1);
        assert_eq!(ranks["App3"], 2);
    }

    #[test]
    fn roster_round_trips() {
        let participants = vec!["App1".to_string(), "App2".to_string(), "App3".to_string()];
        let ranks = assign_ranks(&participants, "App1");
        let encoded = encode_roster(participants.len(), &ranks);
        let (size, decoded) = decode_roster(&encoded).unwrap();
        assert_eq!(size, 3);
        assert_eq!(decoded, ranks);
    }
}
