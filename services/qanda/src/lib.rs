// ドメイン層
pub mod domain;

// アプリケーション層
pub mod application;

// インフラストラクチャ層
pub mod infrastructure;

// HTTP層（ルーター・ハンドラー・HTMLレンダリング）
pub mod web;
