// ==========================================
// 跨境电商数据中台 - 字段字典缓存
// ==========================================
// 职责: 按数据域懒加载字典，生成不可变快照（预编译正则、预计算匹配键）
// 并发: 快照以 Arc 共享，读不加锁；失效时整体替换（写时复制）
// 生命周期: 启动时构造一次，注入匹配器；显式 invalidate 清理
// ==========================================

use crate::domain::field_dictionary::FieldDictionaryEntry;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::field_dictionary_repo::FieldDictionaryStore;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

// ==========================================
// CompiledEntry - 预处理后的字典条目
// ==========================================
#[derive(Debug)]
pub struct CompiledEntry {
    pub entry: FieldDictionaryEntry,
    pub cn_name_key: String,           // 小写去空白的中文名
    pub synonym_keys: Vec<String>,     // 小写去空白的同义词（保序）
    pub en_name_key: Option<String>,   // 小写去空白的英文名
    pub cn_name_chars: HashSet<char>,  // 模糊匹配字符集
    pub pattern: Option<Regex>,        // 已编译的模式（无效或未启用时为 None）
}

impl CompiledEntry {
    fn compile(entry: FieldDictionaryEntry) -> Self {
        let cn_name_key = match_key(&entry.cn_name);
        let synonym_keys = entry
            .synonyms
            .iter()
            .map(|s| match_key(s))
            .filter(|s| !s.is_empty())
            .collect();
        let en_name_key = entry
            .en_name
            .as_deref()
            .map(match_key)
            .filter(|s| !s.is_empty());
        let cn_name_chars = cn_name_key.chars().collect();
        let pattern = compile_pattern(&entry);

        Self {
            entry,
            cn_name_key,
            synonym_keys,
            en_name_key,
            cn_name_chars,
            pattern,
        }
    }
}

/// 精确匹配键: 去首尾空白 + 小写
pub fn match_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// 编译字段模式（锚定开头，不区分大小写）
///
/// 无效模式记录错误并返回 None，不影响其它条目
fn compile_pattern(entry: &FieldDictionaryEntry) -> Option<Regex> {
    if !entry.has_pattern() {
        if entry.is_pattern_based {
            tracing::error!(field_code = %entry.field_code, "模式字段缺少 field_pattern，跳过");
        }
        return None;
    }
    let raw = entry.field_pattern.as_deref()?;

    match RegexBuilder::new(&format!("^(?:{})", raw))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(
                field_code = %entry.field_code,
                pattern = %raw,
                error = %e,
                "字典模式无法编译，跳过该条目"
            );
            None
        }
    }
}

// ==========================================
// DictionarySnapshot - 单个数据域的不可变快照
// ==========================================
#[derive(Debug)]
pub struct DictionarySnapshot {
    pub domain: Option<String>,
    pub generation: u64,
    pub entries: Vec<CompiledEntry>, // 按 match_weight 降序（存储顺序）
}

impl DictionarySnapshot {
    pub fn build(
        domain: Option<String>,
        generation: u64,
        entries: Vec<FieldDictionaryEntry>,
    ) -> Self {
        Self {
            domain,
            generation,
            entries: entries.into_iter().map(CompiledEntry::compile).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 可用的模式条目数
    pub fn pattern_count(&self) -> usize {
        self.entries.iter().filter(|e| e.pattern.is_some()).count()
    }
}

// ==========================================
// DictionaryCache - 按域缓存
// ==========================================
pub struct DictionaryCache {
    store: Arc<dyn FieldDictionaryStore>,
    snapshots: RwLock<HashMap<Option<String>, Arc<DictionarySnapshot>>>,
    generation: AtomicU64,
}

impl DictionaryCache {
    pub fn new(store: Arc<dyn FieldDictionaryStore>) -> Self {
        Self {
            store,
            snapshots: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// 获取某数据域的快照，未缓存时从存储加载
    ///
    /// # 参数
    /// - domain: 数据域（None 表示全部域）
    ///
    /// # 返回
    /// - Err: 字典存储不可用
    pub async fn snapshot(&self, domain: Option<&str>) -> EngineResult<Arc<DictionarySnapshot>> {
        let key = domain.map(str::to_string);

        if let Some(hit) = self.read_snapshot(&key) {
            return Ok(hit);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let entries = self
            .store
            .load_domain(domain)
            .await
            .map_err(EngineError::DictionaryStore)?;
        let snapshot = Arc::new(DictionarySnapshot::build(key.clone(), generation, entries));

        tracing::info!(
            domain = domain.unwrap_or("all"),
            entries = snapshot.len(),
            patterns = snapshot.pattern_count(),
            "字段字典已加载"
        );

        // 快照只读共享，锁中毒后内容仍然有效
        let mut guard = self.snapshots.write().unwrap_or_else(|e| e.into_inner());
        // 加载期间发生失效则不回填，本次调用仍使用新加载的数据
        if self.generation.load(Ordering::Acquire) == generation {
            let cached = guard.entry(key).or_insert_with(|| snapshot.clone());
            return Ok(cached.clone());
        }
        Ok(snapshot)
    }

    fn read_snapshot(&self, key: &Option<String>) -> Option<Arc<DictionarySnapshot>> {
        let guard = self.snapshots.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    /// 清空全部快照
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match self.snapshots.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        tracing::info!("字段字典缓存已清空");
    }

    /// 清除单个数据域的快照
    pub fn invalidate_domain(&self, domain: Option<&str>) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let key = domain.map(str::to_string);
        match self.snapshots.write() {
            Ok(mut guard) => {
                guard.remove(&key);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&key);
            }
        }
        tracing::info!(domain = domain.unwrap_or("all"), "字段字典缓存已失效");
    }

    /// 已缓存的域数量
    pub fn cached_domains(&self) -> usize {
        self.snapshots.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
