//! 運費比價與面單
//!
//! 承運商以 `CarrierGateway` 注入，每次呼叫都有逾時上限。
//! 部分承運商失敗時略過並記錄警告；全部失敗才回傳錯誤。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::task::JoinSet;
use wms_calc::{rank_rates, CarrierTariff};
use wms_core::{Money, Result, ShipmentSpec, ShippingLabel, ShippingRate, WmsError};

/// 承運商介面
#[async_trait]
pub trait CarrierGateway: Send + Sync {
    /// 承運商名稱（與報價中的 carrier 一致）
    fn name(&self) -> &str;

    /// 報價
    async fn quote(&self, shipment: &ShipmentSpec) -> Result<Vec<ShippingRate>>;

    /// 購買面單
    async fn create_label(&self, rate: &ShippingRate, shipment: &ShipmentSpec) -> Result<ShippingLabel>;
}

/// 依費率表報價的承運商
pub struct TariffCarrier {
    tariff: CarrierTariff,
}

impl TariffCarrier {
    pub fn new(tariff: CarrierTariff) -> Self {
        Self { tariff }
    }

    fn tracking_number(&self) -> String {
        let prefix: String = self
            .tariff
            .carrier
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_ascii_uppercase();
        let serial: u64 = rand::thread_rng().gen_range(0..10_000_000_000);
        format!("{}{:010}", prefix, serial)
    }
}

#[async_trait]
impl CarrierGateway for TariffCarrier {
    fn name(&self) -> &str {
        &self.tariff.carrier
    }

    async fn quote(&self, shipment: &ShipmentSpec) -> Result<Vec<ShippingRate>> {
        Ok(self.tariff.quote(shipment.weight_grams))
    }

    async fn create_label(&self, rate: &ShippingRate, _shipment: &ShipmentSpec) -> Result<ShippingLabel> {
        if rate.carrier != self.tariff.carrier {
            return Err(WmsError::InvalidInput(format!(
                "報價承運商 {} 與 {} 不符",
                rate.carrier, self.tariff.carrier
            )));
        }
        let tracking_number = self.tracking_number();
        Ok(ShippingLabel {
            carrier: rate.carrier.clone(),
            service: rate.service,
            label_url: format!("labels/{}/{}.pdf", rate.carrier.to_lowercase(), tracking_number),
            tracking_number,
        })
    }
}

/// 運費比價服務
pub struct RateShopper {
    carriers: Vec<Arc<dyn CarrierGateway>>,
    timeout: Duration,
}

impl RateShopper {
    pub fn new(carriers: Vec<Arc<dyn CarrierGateway>>, timeout: Duration) -> Self {
        Self { carriers, timeout }
    }

    /// 向所有承運商詢價，依運費遞增排序
    pub async fn get_rates(&self, shipment: &ShipmentSpec) -> Result<Vec<ShippingRate>> {
        if self.carriers.is_empty() {
            return Err(WmsError::ExternalDependencyFailure("沒有設定承運商".to_string()));
        }

        let mut calls = JoinSet::new();
        for carrier in &self.carriers {
            let carrier = Arc::clone(carrier);
            let shipment = *shipment;
            let timeout = self.timeout;
            calls.spawn(async move {
                let name = carrier.name().to_string();
                let result = bounded(&name, timeout, carrier.quote(&shipment)).await;
                (name, result)
            });
        }

        let mut rates = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok((_, Ok(quoted))) => rates.extend(quoted),
                Ok((name, Err(e))) => {
                    tracing::warn!("承運商 {} 報價失敗，已略過: {}", name, e);
                    failures.push(e.to_string());
                }
                Err(e) => {
                    tracing::warn!("承運商報價工作異常結束: {}", e);
                    failures.push(e.to_string());
                }
            }
        }

        if failures.len() == self.carriers.len() {
            return Err(WmsError::ExternalDependencyFailure(format!(
                "所有承運商報價失敗: {}",
                failures.join("; ")
            )));
        }

        rates.retain(|rate| rate.cost >= Money::ZERO);
        rank_rates(&mut rates);

        tracing::debug!("取得報價 {} 筆（失敗承運商 {} 家）", rates.len(), failures.len());
        Ok(rates)
    }

    /// 向報價所屬承運商購買面單
    pub async fn purchase_label(&self, rate: &ShippingRate, shipment: &ShipmentSpec) -> Result<ShippingLabel> {
        let carrier = self
            .carriers
            .iter()
            .find(|c| c.name() == rate.carrier)
            .ok_or_else(|| WmsError::not_found("承運商", rate.carrier.as_str()))?;

        let label = bounded(&rate.carrier, self.timeout, carrier.create_label(rate, shipment)).await?;
        tracing::info!(
            "已購買面單 {} {:?}: {}",
            label.carrier,
            label.service,
            label.tracking_number
        );
        Ok(label)
    }
}

/// 以逾時包住承運商呼叫，逾時與錯誤都視為外部依賴失敗
async fn bounded<T>(
    carrier: &str,
    timeout: Duration,
    call: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(WmsError::ExternalDependencyFailure(message))) => {
            Err(WmsError::ExternalDependencyFailure(message))
        }
        Ok(Err(e)) => Err(WmsError::ExternalDependencyFailure(format!("承運商 {}: {}", carrier, e))),
        Err(_) => Err(WmsError::ExternalDependencyFailure(format!(
            "承運商 {} 逾時（{} 毫秒）",
            carrier,
            timeout.as_millis()
        ))),
    }
}
