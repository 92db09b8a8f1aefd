use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::JwtConfig;
use crate::auth::jwt::generate_printable_secret;
use crate::orders::PricingConfig;
use crate::payments::PaymentsConfig;
use crate::payments::card::CardConfig;
use crate::payments::momo::MomoConfig;
use crate::payments::vnpay::VnPayConfig;
use crate::payments::zalopay::ZaloPayConfig;

const DEFAULT_MOMO_ENDPOINT: &str = "https://test-payment.momo.vn";
const DEFAULT_ZALOPAY_ENDPOINT: &str = "https://sb-openapi.zalopay.vn";
const DEFAULT_VNPAY_PAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    MissingSecret(&'static str, String),

    #[error("{0} must not be empty in {1} environment")]
    EmptySecret(&'static str, String),
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | redb 文件与日志目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 默认日志级别 |
/// | LOG_JSON | production 时为 true | JSON 控制台输出 |
/// | PUBLIC_BASE_URL | http://localhost:3000 | 支付回调 / 跳转地址前缀 |
/// | RESERVATION_TTL_MINUTES | 15 | 购物车占用时长 |
/// | RESERVATION_SWEEP_SECS | 60 | 占用过期扫描周期 |
/// | DRAFT_ORDER_TTL_MINUTES | 30 | 在线支付草稿订单期限 |
/// | DRAFT_SWEEP_SECS | 60 | 草稿订单扫描周期 |
/// | TAX_RATE_PERCENT | 0 | 税率 (%) |
/// | SHIPPING_FEE | 30000 | 运费 |
/// | FREE_SHIPPING_THRESHOLD | 500000 | 免运费门槛 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | ADDRESS_API_URL | https://provinces.open-api.vn/api | 省市数据源 |
/// | ADDRESS_CACHE_TTL_SECS | 86400 | 地址缓存时长 |
/// | NOTIFY_WEBHOOK_URL | - | 订单通知 webhook |
///
/// JWT_* and the payment provider credentials are documented on
/// [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub public_base_url: String,
    pub request_timeout_ms: u64,

    // === 库存 / 订单 ===
    pub reservation_ttl_minutes: u64,
    pub reservation_sweep_secs: u64,
    pub draft_order_ttl_minutes: u64,
    pub draft_sweep_secs: u64,
    pub pricing: PricingConfig,

    pub jwt: JwtConfig,
    pub payments: PaymentsConfig,

    pub address_api_url: String,
    pub address_cache_ttl_secs: u64,
    pub notify_webhook_url: Option<String>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

impl Config {
    /// Secrets must be present outside development
    fn require_secret(name: &'static str, environment: &str) -> Result<Option<String>, ConfigError> {
        match std::env::var(name) {
            Ok(v) if v.is_empty() && environment != "development" => {
                Err(ConfigError::EmptySecret(name, environment.into()))
            }
            Ok(v) if v.is_empty() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(_) if environment != "development" => {
                Err(ConfigError::MissingSecret(name, environment.into()))
            }
            Err(_) => Ok(None),
        }
    }

    /// 从环境变量加载配置
    ///
    /// - `JWT_SECRET` is required outside development; a random key is
    ///   generated for development runs (tokens die with the process).
    /// - `JWT_ISSUER` / `JWT_AUDIENCE` / `JWT_EXPIRATION_MINUTES`
    /// - MoMo: `MOMO_PARTNER_CODE`, `MOMO_ACCESS_KEY`, `MOMO_SECRET_KEY`, `MOMO_ENDPOINT`
    /// - ZaloPay: `ZALOPAY_APP_ID`, `ZALOPAY_KEY1`, `ZALOPAY_KEY2`, `ZALOPAY_ENDPOINT`
    /// - VNPay: `VNPAY_TMN_CODE`, `VNPAY_HASH_SECRET`, `VNPAY_PAY_URL`
    /// - Card: `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `CARD_CURRENCY`
    ///
    /// A provider is only configured when all of its credentials are set;
    /// endpoints default to the providers' sandboxes.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment = env_string("ENVIRONMENT", &defaults.environment);
        let production = environment == "production";

        let jwt_secret =
            Self::require_secret("JWT_SECRET", &environment)?.unwrap_or_else(generate_printable_secret);

        let public_base_url = env_string("PUBLIC_BASE_URL", &defaults.public_base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            work_dir: env_string("WORK_DIR", &defaults.work_dir),
            http_port: env_or("HTTP_PORT", defaults.http_port),
            log_level: env_string("LOG_LEVEL", &defaults.log_level),
            log_json: env_or("LOG_JSON", production),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),

            reservation_ttl_minutes: env_or("RESERVATION_TTL_MINUTES", defaults.reservation_ttl_minutes),
            reservation_sweep_secs: env_or("RESERVATION_SWEEP_SECS", defaults.reservation_sweep_secs),
            draft_order_ttl_minutes: env_or("DRAFT_ORDER_TTL_MINUTES", defaults.draft_order_ttl_minutes),
            draft_sweep_secs: env_or("DRAFT_SWEEP_SECS", defaults.draft_sweep_secs),
            pricing: PricingConfig {
                tax_rate_percent: env_or::<Decimal>("TAX_RATE_PERCENT", defaults.pricing.tax_rate_percent),
                shipping_fee: env_or::<Decimal>("SHIPPING_FEE", defaults.pricing.shipping_fee),
                free_shipping_threshold: env_or::<Decimal>(
                    "FREE_SHIPPING_THRESHOLD",
                    defaults.pricing.free_shipping_threshold,
                ),
            },

            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_minutes: env_or("JWT_EXPIRATION_MINUTES", defaults.jwt.expiration_minutes),
                issuer: env_string("JWT_ISSUER", &defaults.jwt.issuer),
                audience: env_string("JWT_AUDIENCE", &defaults.jwt.audience),
            },
            payments: Self::payments_from_env(&public_base_url),

            address_api_url: env_string("ADDRESS_API_URL", &defaults.address_api_url),
            address_cache_ttl_secs: env_or("ADDRESS_CACHE_TTL_SECS", defaults.address_cache_ttl_secs),
            notify_webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),

            public_base_url,
            environment,
        })
    }

    fn payments_from_env(public_base_url: &str) -> PaymentsConfig {
        let momo = match (
            env_opt("MOMO_PARTNER_CODE"),
            env_opt("MOMO_ACCESS_KEY"),
            env_opt("MOMO_SECRET_KEY"),
        ) {
            (Some(partner_code), Some(access_key), Some(secret_key)) => Some(MomoConfig {
                partner_code,
                access_key,
                secret_key,
                endpoint: env_string("MOMO_ENDPOINT", DEFAULT_MOMO_ENDPOINT),
            }),
            _ => None,
        };

        let zalopay = match (env_opt("ZALOPAY_APP_ID"), env_opt("ZALOPAY_KEY1"), env_opt("ZALOPAY_KEY2")) {
            (Some(app_id), Some(key1), Some(key2)) => Some(ZaloPayConfig {
                app_id,
                key1,
                key2,
                endpoint: env_string("ZALOPAY_ENDPOINT", DEFAULT_ZALOPAY_ENDPOINT),
            }),
            _ => None,
        };

        let vnpay = match (env_opt("VNPAY_TMN_CODE"), env_opt("VNPAY_HASH_SECRET")) {
            (Some(tmn_code), Some(hash_secret)) => Some(VnPayConfig {
                tmn_code,
                hash_secret,
                pay_url: env_string("VNPAY_PAY_URL", DEFAULT_VNPAY_PAY_URL),
            }),
            _ => None,
        };

        let card = match (env_opt("STRIPE_SECRET_KEY"), env_opt("STRIPE_WEBHOOK_SECRET")) {
            (Some(secret_key), Some(webhook_secret)) => Some(CardConfig {
                secret_key,
                webhook_secret,
                currency: env_string("CARD_CURRENCY", "vnd").to_lowercase(),
            }),
            _ => None,
        };

        PaymentsConfig {
            public_base_url: public_base_url.to_string(),
            momo,
            zalopay,
            vnpay,
            card,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("shop.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }
}

/// Documented defaults, no environment lookups
impl Default for Config {
    fn default() -> Self {
        let public_base_url = "http://localhost:3000".to_string();
        Self {
            work_dir: "./data".into(),
            http_port: 3000,
            environment: "development".into(),
            log_level: "info".into(),
            log_json: false,
            request_timeout_ms: 30_000,
            reservation_ttl_minutes: 15,
            reservation_sweep_secs: 60,
            draft_order_ttl_minutes: 30,
            draft_sweep_secs: 60,
            pricing: PricingConfig::default(),
            jwt: JwtConfig {
                secret: generate_printable_secret(),
                expiration_minutes: 1440,
                issuer: "shop-server".into(),
                audience: "shop-clients".into(),
            },
            payments: PaymentsConfig {
                public_base_url: public_base_url.clone(),
                ..PaymentsConfig::default()
            },
            address_api_url: "https://provinces.open-api.vn/api".into(),
            address_cache_ttl_secs: 86_400,
            notify_webhook_url: None,
            public_base_url,
        }
    }
}
