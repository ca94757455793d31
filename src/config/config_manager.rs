// ==========================================
// 地铁夜间编组排班系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::scheduler_config::SchedulerConfig;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

// ==========================================
// SchedulerConfigReader - 配置读取契约
// ==========================================
#[async_trait]
pub trait SchedulerConfigReader: Send + Sync {
    async fn load_scheduler_config(&self) -> Result<SchedulerConfig, Box<dyn Error>>;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    cache: RwLock<HashMap<String, Option<String>>>,
}

impl ConfigManager {
    /// 打开配置库并确保建表
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// 从已有连接创建 (会再次应用统一 PRAGMA, 幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
            Self::ensure_schema(&guard)?;
        }
        Ok(Self {
            conn,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL DEFAULT 'global',
                key      TEXT NOT NULL,
                value    TEXT NOT NULL,
                PRIMARY KEY (scope_id, key)
            );",
        )
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(v) = cache.get(key) {
                return Ok(v.clone());
            }
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        let value = match result {
            Ok(value) => Some(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(Box::new(e)),
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), value.clone());
        }

        Ok(value)
    }

    /// 写入配置值并失效缓存
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
            params![key, value],
        )?;
        drop(conn);
        self.invalidate_cache_all();
        Ok(())
    }

    /// 失效缓存 (配置写入后调用)
    pub fn invalidate_cache_all(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// 解析单键; 缺失或非法时回退默认值并告警
    fn parse_or<T: FromStr + Copy>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    warn!(key, raw = %raw, "配置值非法, 回退默认值");
                    Ok(default)
                }
            },
        }
    }
}

#[async_trait]
impl SchedulerConfigReader for ConfigManager {
    async fn load_scheduler_config(&self) -> Result<SchedulerConfig, Box<dyn Error>> {
        let d = SchedulerConfig::default();
        Ok(SchedulerConfig {
            roster_size: self.parse_or("roster_size", d.roster_size)?,
            solver_budget_seconds: self
                .parse_or("solver_budget_seconds", d.solver_budget_seconds)?,
            enable_relaxation: self.parse_or("enable_relaxation", d.enable_relaxation)?,
            depot_balance_lo: self.parse_or("depot_balance_lo", d.depot_balance_lo)?,
            depot_balance_hi: self.parse_or("depot_balance_hi", d.depot_balance_hi)?,
            age_new_years_max: self.parse_or("age_new_years_max", d.age_new_years_max)?,
            age_new_min: self.parse_or("age_new_min", d.age_new_min)?,
            vendor_min: self.parse_or("vendor_min", d.vendor_min)?,
            critical_branding_min: self
                .parse_or("critical_branding_min", d.critical_branding_min)?,
            mileage_band: (
                self.parse_or("mileage_band_lo", d.mileage_band.0)?,
                self.parse_or("mileage_band_hi", d.mileage_band.1)?,
            ),
            mileage_band_min: self.parse_or("mileage_band_min", d.mileage_band_min)?,
            home_bay_min: self.parse_or("home_bay_min", d.home_bay_min)?,
        })
    }
}
