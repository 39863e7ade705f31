//! 动画容器
//!
//! 容器维护 名字 → (ID, 片段) 的映射。ID 在首次注册时顺序分配，
//! **重新定义同名片段会替换内容但保留 ID**：行为层可能已经把 ID
//! 缓存进了消息里。

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::animation::Animation;
use crate::error::AnimError;

/// 动画 ID（顺序分配，进程内稳定）
pub type AnimationId = u32;

/// 名字索引的动画存储
#[derive(Debug, Default)]
pub struct AnimationContainer {
    animations: HashMap<String, (AnimationId, Animation)>,
    next_id: AnimationId,
}

impl AnimationContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或替换）一个动画
    ///
    /// 返回分配的 ID。同名替换保留原 ID。
    pub fn add_animation(&mut self, anim: Animation) -> AnimationId {
        let name = anim.name().to_string();
        if let Some((existing_id, slot)) = self.animations.get_mut(&name) {
            info!(clip = %name, id = *existing_id, "Replacing existing animation");
            *slot = anim;
            *existing_id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            debug!(clip = %name, id, "Adding new animation");
            self.animations.insert(name, (id, anim));
            id
        }
    }

    /// 按名字取动画
    pub fn get(&self, name: &str) -> Result<&Animation, AnimError> {
        self.animations
            .get(name)
            .map(|(_, anim)| anim)
            .ok_or_else(|| AnimError::UnknownClip(name.to_string()))
    }

    /// 按名字取动画（可变，流送端推进游标用）
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Animation, AnimError> {
        self.animations
            .get_mut(name)
            .map(|(_, anim)| anim)
            .ok_or_else(|| AnimError::UnknownClip(name.to_string()))
    }

    /// 名字 → ID
    pub fn id_of(&self, name: &str) -> Option<AnimationId> {
        self.animations.get(name).map(|(id, _)| *id)
    }

    /// ID → 名字（反向查询，诊断用）
    pub fn name_of(&self, id: AnimationId) -> Option<&str> {
        self.animations
            .iter()
            .find(|(_, (existing_id, _))| *existing_id == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// 所有动画名（按名字排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.animations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 从 JSON 字符串加载：`{ "<clipName>": [ …keyframes… ], … }`
    ///
    /// 返回本次加载的片段数。片段按名字排序后注册，保证 ID 分配
    /// 与文件内容一一对应、与 HashMap 迭代顺序无关。
    pub fn load_json_str(&mut self, json: &str) -> Result<usize, AnimError> {
        let root: Value = serde_json::from_str(json)?;
        let Some(map) = root.as_object() else {
            return Err(AnimError::MissingField {
                clip: "(root)".to_string(),
                index: 0,
                field: "(object of clips)",
            });
        };

        let mut names: Vec<&String> = map.keys().collect();
        names.sort_unstable();

        for name in &names {
            let anim = Animation::from_json_value(name, &map[name.as_str()])?;
            self.add_animation(anim);
        }
        Ok(names.len())
    }

    /// 从单个 JSON 文件加载
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, AnimError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading animation file");
        let json = std::fs::read_to_string(path)?;
        self.load_json_str(&json)
    }

    /// 从目录加载所有 `*.json` 文件
    ///
    /// 文件按文件名排序后依次加载，保证多次启动时 ID 分配一致。
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, AnimError> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut total = 0;
        for path in &paths {
            total += self.load_file(path)?;
        }
        info!(dir = %dir.display(), files = paths.len(), clips = total, "Loaded animation directory");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TWO_CLIPS: &str = r#"{
        "anim_blink": [
            {"Name": "ProceduralFaceKeyFrame", "triggerTime_ms": 0,
             "leftEye": {"centerX": 40.0, "centerY": 32.0},
             "rightEye": {"centerX": 88.0, "centerY": 32.0}}
        ],
        "anim_wave": [
            {"Name": "HeadAngleKeyFrame", "triggerTime_ms": 0, "durationTime_ms": 100, "angle_deg": 10}
        ]
    }"#;

    #[test]
    fn test_sequential_id_assignment() {
        let mut container = AnimationContainer::new();
        let loaded = container.load_json_str(TWO_CLIPS).unwrap();
        assert_eq!(loaded, 2);
        // 按名字排序注册：anim_blink = 0, anim_wave = 1
        assert_eq!(container.id_of("anim_blink"), Some(0));
        assert_eq!(container.id_of("anim_wave"), Some(1));
        assert_eq!(container.name_of(1), Some("anim_wave"));
        assert_eq!(container.id_of("anim_missing"), None);
    }

    #[test]
    fn test_replace_keeps_id() {
        let mut container = AnimationContainer::new();
        container.load_json_str(TWO_CLIPS).unwrap();
        let original_id = container.id_of("anim_wave").unwrap();

        // 重新定义 anim_wave，换一个头部角度
        let replacement = r#"{
            "anim_wave": [
                {"Name": "HeadAngleKeyFrame", "triggerTime_ms": 0, "durationTime_ms": 100, "angle_deg": -35}
            ]
        }"#;
        container.load_json_str(replacement).unwrap();

        assert_eq!(container.id_of("anim_wave"), Some(original_id));
        assert_eq!(container.len(), 2);
        let anim = container.get("anim_wave").unwrap();
        assert_eq!(anim.head.current().unwrap().angle_deg, -35);
    }

    #[test]
    fn test_ids_never_reused_after_replace() {
        let mut container = AnimationContainer::new();
        container.load_json_str(TWO_CLIPS).unwrap();
        container.load_json_str(TWO_CLIPS).unwrap(); // 全部替换

        let extra = r#"{"anim_spin": []}"#;
        container.load_json_str(extra).unwrap();
        // 新片段拿到新 ID，而不是复用 0/1
        assert_eq!(container.id_of("anim_spin"), Some(2));
    }

    #[test]
    fn test_get_unknown_clip() {
        let container = AnimationContainer::new();
        assert!(matches!(
            container.get("nope"),
            Err(AnimError::UnknownClip(_))
        ));
    }

    #[test]
    fn test_names_sorted() {
        let mut container = AnimationContainer::new();
        container.load_json_str(TWO_CLIPS).unwrap();
        assert_eq!(container.names(), ["anim_blink", "anim_wave"]);
    }

    #[test]
    fn test_root_must_be_object() {
        let mut container = AnimationContainer::new();
        assert!(container.load_json_str("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_load_dir_sorted_by_filename() {
        let dir = tempfile::tempdir().unwrap();

        let mut f2 = std::fs::File::create(dir.path().join("b_second.json")).unwrap();
        write!(f2, r#"{{"anim_second": []}}"#).unwrap();
        let mut f1 = std::fs::File::create(dir.path().join("a_first.json")).unwrap();
        write!(f1, r#"{{"anim_first": []}}"#).unwrap();
        // 非 json 文件被忽略
        std::fs::File::create(dir.path().join("notes.txt")).unwrap();

        let mut container = AnimationContainer::new();
        let loaded = container.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(container.id_of("anim_first"), Some(0));
        assert_eq!(container.id_of("anim_second"), Some(1));
    }
}
