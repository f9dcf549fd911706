//! GLSL ES 3.00 programs for both effects.

use crate::config::{BlendMode, EffectKind};

/// Vertex + fragment source pair and the fixed-function state it expects.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderProgram {
    pub vertex: String,
    pub fragment: String,
    pub blend: BlendMode,
    pub depth_write: bool,
}

impl ShaderProgram {
    pub fn for_kind(kind: EffectKind) -> Self {
        let blend = kind.config().blend;
        let (vertex, fragment) = match kind {
            EffectKind::Aurora => (
                [HEADER, AURORA_VERTEX].concat(),
                [HEADER, NOISE, AURORA_FRAGMENT].concat(),
            ),
            EffectKind::Particles => (
                [HEADER, NOISE, PARTICLES_VERTEX].concat(),
                [HEADER, PARTICLES_FRAGMENT].concat(),
            ),
        };
        Self {
            vertex,
            fragment,
            blend,
            depth_write: blend != BlendMode::Additive,
        }
    }
}

const HEADER: &str = "#version 300 es
precision highp float;
";

/// 3D simplex noise with period-289 permutation hashing. Range roughly [-1, 1].
const NOISE: &str = "
vec3 mod289(vec3 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 mod289(vec4 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 permute(vec4 x) { return mod289(((x * 34.0) + 1.0) * x); }
vec4 taylorInvSqrt(vec4 r) { return 1.79284291400159 - 0.85373472095314 * r; }

float snoise(vec3 v) {
  const vec2 C = vec2(1.0 / 6.0, 1.0 / 3.0);
  const vec4 D = vec4(0.0, 0.5, 1.0, 2.0);

  vec3 i = floor(v + dot(v, C.yyy));
  vec3 x0 = v - i + dot(i, C.xxx);

  vec3 g = step(x0.yzx, x0.xyz);
  vec3 l = 1.0 - g;
  vec3 i1 = min(g.xyz, l.zxy);
  vec3 i2 = max(g.xyz, l.zxy);

  vec3 x1 = x0 - i1 + C.xxx;
  vec3 x2 = x0 - i2 + C.yyy;
  vec3 x3 = x0 - D.yyy;

  i = mod289(i);
  vec4 p = permute(permute(permute(
              i.z + vec4(0.0, i1.z, i2.z, 1.0))
            + i.y + vec4(0.0, i1.y, i2.y, 1.0))
            + i.x + vec4(0.0, i1.x, i2.x, 1.0));

  float n_ = 0.142857142857;
  vec3 ns = n_ * D.wyz - D.xzx;

  vec4 j = p - 49.0 * floor(p * ns.z * ns.z);
  vec4 x_ = floor(j * ns.z);
  vec4 y_ = floor(j - 7.0 * x_);

  vec4 x = x_ * ns.x + ns.yyyy;
  vec4 y = y_ * ns.x + ns.yyyy;
  vec4 h = 1.0 - abs(x) - abs(y);

  vec4 b0 = vec4(x.xy, y.xy);
  vec4 b1 = vec4(x.zw, y.zw);
  vec4 s0 = floor(b0) * 2.0 + 1.0;
  vec4 s1 = floor(b1) * 2.0 + 1.0;
  vec4 sh = -step(h, vec4(0.0));

  vec4 a0 = b0.xzyw + s0.xzyw * sh.xxyy;
  vec4 a1 = b1.xzyw + s1.xzyw * sh.zzww;

  vec3 p0 = vec3(a0.xy, h.x);
  vec3 p1 = vec3(a0.zw, h.y);
  vec3 p2 = vec3(a1.xy, h.z);
  vec3 p3 = vec3(a1.zw, h.w);

  vec4 norm = taylorInvSqrt(vec4(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
  p0 *= norm.x;
  p1 *= norm.y;
  p2 *= norm.z;
  p3 *= norm.w;

  vec4 m = max(0.6 - vec4(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), 0.0);
  m = m * m;
  return 42.0 * dot(m * m, vec4(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}
";

const AURORA_VERTEX: &str = "
uniform float uTime;
uniform vec2 uPointer;
uniform mat4 uModel;
uniform mat4 uView;
uniform mat4 uProjection;

in vec3 position;
in vec2 uv;
in float aScale;
in float aPhase;
in vec2 aVelocity;

out float vAlpha;
out float vMix;
out vec2 vUv;

void main() {
  vUv = uv;
  vec3 pos = position;
  float time = uTime * 0.5;

  float wave1 = sin(pos.x * 3.0 + time + aPhase) * 0.1;
  float wave2 = sin(pos.y * 2.0 + time * 0.7 + aPhase) * 0.1;
  float wave3 = sin((pos.x + pos.y) * 1.5 + time * 1.2 + aPhase) * 0.05;
  pos.x += wave1 + wave3;
  pos.y += wave2 + wave3;

  pos.x += aVelocity.x * sin(time + aPhase) * 2.0;
  pos.y += aVelocity.y * cos(time + aPhase) * 2.0;

  // uPointer is in NDC; uv space is [0, 1]
  vec2 pointerUv = (uPointer + 1.0) * 0.5;
  float influence = 1.0 - smoothstep(0.0, 0.3, distance(uv, pointerUv));
  pos.xy += influence * (uPointer - pos.xy) * 0.3;

  gl_Position = uProjection * uView * uModel * vec4(pos, 1.0);

  vAlpha = aScale * (0.3 + influence * 0.7);
  vMix = smoothstep(0.0, 1.0, length(uv - 0.5));
}
";

const AURORA_FRAGMENT: &str = "
uniform float uTime;
uniform vec2 uPointer;
uniform vec2 uResolution;
uniform vec3 uColors[3];

in float vAlpha;
in float vMix;
in vec2 vUv;

out vec4 fragColor;

void main() {
  vec2 uv = vUv;
  float time = uTime * 0.5;

  float dist = distance(uv, vec2(0.5));
  float glow = exp(-dist * 8.0) * vAlpha;

  vec2 pointer = (uPointer + 1.0) * 0.5;
  float pointerGlow = exp(-distance(uv, pointer) * 12.0) * 0.8;

  float mix1 = sin(uv.x * 3.0 + time + vMix * 2.0) * 0.5 + 0.5;
  float mix2 = sin(uv.y * 2.0 + time * 0.7 + vMix * 1.5) * 0.5 + 0.5;
  vec3 base = mix(uColors[0], uColors[1], mix1);
  base = mix(base, uColors[2], mix2 * 0.6);

  float intensity = glow + pointerGlow;
  vec3 color = base * intensity;

  color += snoise(vec3(uv * 8.0, time * 1.5)) * 0.1;

  float shimmer = sin(uv.x * 10.0 + time * 2.0) * sin(uv.y * 8.0 + time * 1.5) * 0.1;
  color += shimmer * intensity;

  color *= 1.0 - smoothstep(0.3, 1.0, dist);

  fragColor = vec4(clamp(color, 0.0, 1.0), clamp(intensity * 0.8, 0.0, 1.0));
}
";

const PARTICLES_VERTEX: &str = "
uniform float uTime;
uniform mat4 uModel;
uniform mat4 uView;
uniform mat4 uProjection;

in vec3 position;
in float aScale;
in float aColorStop;

out float vColorStop;

void main() {
  vColorStop = aColorStop;
  vec3 p = position;
  float n = snoise(p * 0.45 + uTime * 0.05);
  p += normalize(p) * n * 0.32;

  vec4 viewPos = uView * uModel * vec4(p, 1.0);
  gl_PointSize = aScale * 26.0 * (1.0 / -viewPos.z);
  gl_Position = uProjection * viewPos;
}
";

const PARTICLES_FRAGMENT: &str = "
uniform vec3 uColors[3];

in float vColorStop;

out vec4 fragColor;

void main() {
  float d = length(gl_PointCoord - 0.5);
  if (d > 0.5) discard;
  float fade = smoothstep(0.5, 0.0, d);
  vec3 c = mix(uColors[0], uColors[1], smoothstep(0.0, 0.5, vColorStop));
  c = mix(c, uColors[2], smoothstep(0.5, 1.0, vColorStop));
  fragColor = vec4(c, fade * 0.9);
}
";
