//! 命令历史
//!
//! 有容量上限的撤销/重做栈，支持：
//! - 压入时合并同类命令
//! - 超出容量时淘汰最旧的命令
//! - 记录"干净"位置，用于判断文档是否有未保存的修改

use crate::command::Command;
use crate::document::Document;
use std::collections::VecDeque;
use tracing::debug;

/// 默认容量
pub const DEFAULT_CAPACITY: usize = 100;

/// 历史统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// 压入的命令总数（包括被合并的）
    pub total_commands: usize,

    /// 被合并进前一个命令的次数
    pub merged_commands: usize,

    /// 因超出容量被淘汰的命令数
    pub evicted_commands: usize,
}

/// 命令栈
///
/// `commands[..applied]` 是已执行的命令，`commands[applied..]` 是可以重做的命令。
#[derive(Debug)]
pub struct CommandStack {
    commands: VecDeque<Box<dyn Command>>,

    /// 已执行的命令数
    applied: usize,

    /// 干净状态对应的已执行命令数，`None` 表示干净状态已不可达
    clean: Option<usize>,

    capacity: usize,

    stats: HistoryStats,
}

impl CommandStack {
    /// 创建命令栈
    ///
    /// # Panics
    ///
    /// `capacity` 为 0 时 panic。
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "command stack capacity must be positive");
        Self {
            commands: VecDeque::with_capacity(capacity),
            applied: 0,
            clean: Some(0),
            capacity,
            stats: HistoryStats::default(),
        }
    }

    /// 执行命令并压入栈
    ///
    /// 所有可重做的命令都会被丢弃。能与栈顶命令合并时不会新增条目。
    pub fn push(&mut self, document: &mut Document, mut command: Box<dyn Command>) {
        self.discard_redoable(document);

        command.apply(document);
        self.stats.total_commands += 1;

        if let Some(top) = self.commands.back_mut() {
            if top.merge_with(command.as_ref()) {
                self.stats.merged_commands += 1;
                if self.clean == Some(self.applied) {
                    self.clean = None;
                }
                debug!("Merged command '{}'", command.text());
                return;
            }
        }

        debug!("Pushed command '{}'", command.text());
        self.commands.push_back(command);
        self.applied += 1;

        while self.commands.len() > self.capacity {
            self.evict_oldest(document);
        }
    }

    /// 撤销栈顶的已执行命令，没有可撤销的命令时不做任何事
    pub fn undo(&mut self, document: &mut Document) {
        if !self.can_undo() {
            return;
        }

        self.applied -= 1;
        let command = &mut self.commands[self.applied];
        command.undo(document);
        debug!("Undid command '{}'", command.text());
    }

    /// 重做下一个命令，没有可重做的命令时不做任何事
    pub fn redo(&mut self, document: &mut Document) {
        if !self.can_redo() {
            return;
        }

        let command = &mut self.commands[self.applied];
        command.apply(document);
        debug!("Redid command '{}'", command.text());
        self.applied += 1;
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.commands.len()
    }

    pub fn undo_text(&self) -> Option<&str> {
        let index = self.applied.checked_sub(1)?;
        self.commands.get(index).map(|command| command.text())
    }

    pub fn redo_text(&self) -> Option<&str> {
        self.commands.get(self.applied).map(|command| command.text())
    }

    /// 最近执行的命令的位置
    pub fn index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// 干净状态下最近执行的命令的位置
    ///
    /// 干净状态是"没有执行任何命令"或已不可达时返回 `None`。
    pub fn clean_index(&self) -> Option<usize> {
        self.clean.and_then(|clean| clean.checked_sub(1))
    }

    pub fn is_clean(&self) -> bool {
        self.clean == Some(self.applied)
    }

    /// 把当前位置标记为干净状态（例如保存之后）
    pub fn mark_as_clean(&mut self) {
        self.clean = Some(self.applied);
    }

    /// 使干净状态不可达
    pub fn reset_clean_index(&mut self) {
        self.clean = None;
    }

    /// 栈中的命令数（包括可重做的）
    pub fn size(&self) -> usize {
        self.commands.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 修改容量，多出的命令先从可重做的一端丢弃，再从最旧的一端淘汰
    ///
    /// # Panics
    ///
    /// `capacity` 为 0 时 panic。
    pub fn set_capacity(&mut self, document: &mut Document, capacity: usize) {
        assert!(capacity > 0, "command stack capacity must be positive");
        self.capacity = capacity;

        while self.commands.len() > capacity && self.can_redo() {
            if let Some(mut command) = self.commands.pop_back() {
                command.dispose(document);
            }
        }
        if self.clean.is_some_and(|clean| clean > self.commands.len()) {
            self.clean = None;
        }

        while self.commands.len() > capacity {
            self.evict_oldest(document);
        }
    }

    /// 丢弃所有命令
    ///
    /// 之前处于干净状态时，清空后仍然是干净的。
    pub fn clear(&mut self, document: &mut Document) {
        let was_clean = self.is_clean();

        for mut command in self.commands.drain(..) {
            command.dispose(document);
        }

        self.applied = 0;
        self.clean = was_clean.then_some(0);
    }

    pub fn stats(&self) -> &HistoryStats {
        &self.stats
    }

    fn discard_redoable(&mut self, document: &mut Document) {
        if self.clean.is_some_and(|clean| clean > self.applied) {
            self.clean = None;
        }

        while self.commands.len() > self.applied {
            if let Some(mut command) = self.commands.pop_back() {
                command.dispose(document);
            }
        }
    }

    fn evict_oldest(&mut self, document: &mut Document) {
        let Some(mut command) = self.commands.pop_front() else {
            return;
        };

        command.dispose(document);
        self.applied = self.applied.saturating_sub(1);
        self.clean = match self.clean {
            Some(0) | None => None,
            Some(clean) => Some(clean - 1),
        };
        self.stats.evicted_commands += 1;
        debug!("Evicted command '{}'", command.text());
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
